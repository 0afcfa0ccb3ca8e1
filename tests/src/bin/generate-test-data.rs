use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use anyhow::Context;
use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use threadboard_api::{BoardConfig, CommentData};
use threadboard_client::{build_tree, Clock, KvBackend, MemoryKv, Repository, TableStore};

const AUTHORS: &[&str] = &["Alice", "Bob", "Carol", "Dave", "Eve"];

const MIN_WORDS: usize = 3;
const MAX_WORDS: usize = 60;

#[derive(structopt::StructOpt)]
struct Opt {
    /// Number of comments to generate
    #[structopt(short, long, default_value = "50")]
    count: usize,

    /// Probability for each comment to answer a previous one
    #[structopt(short, long, default_value = "0.6")]
    reply_probability: f64,

    /// Probability for each comment to get deleted once everything is posted
    #[structopt(short, long, default_value = "0.1")]
    delete_probability: f64,

    /// Depth at which replies start being shown as roots
    #[structopt(long, default_value = "4")]
    max_depth: usize,

    /// Print the comment tree instead of the stored table
    #[structopt(long)]
    tree: bool,
}

fn gen_text(rng: &mut impl Rng) -> String {
    lipsum::lipsum_words(rng.gen_range(MIN_WORDS..=MAX_WORDS))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let config = BoardConfig {
        max_depth: opt.max_depth,
        ..BoardConfig::default()
    };
    config.validate().context("validating board configuration")?;
    for p in [opt.reply_probability, opt.delete_probability] {
        anyhow::ensure!(
            (0.0..=1.0).contains(&p),
            "probability {p} is not in [0, 1]"
        );
    }

    let store = TableStore::open(MemoryKv::new())
        .context("opening comments table")?;
    let store = Arc::new(store);
    // one minute between each comment, the last one being posted about now
    let start = Utc::now() - Duration::minutes(opt.count as i64);
    let ticks = AtomicI64::new(0);
    let clock: Clock = Arc::new(move || {
        start + Duration::minutes(ticks.fetch_add(1, Ordering::Relaxed))
    });
    let repo = Repository::with_clock(store.clone(), clock);

    let mut rng = rand::thread_rng();
    let mut ids = Vec::with_capacity(opt.count);
    for _ in 0..opt.count {
        let parent = match !ids.is_empty() && rng.gen_bool(opt.reply_probability) {
            true => ids.choose(&mut rng).copied(),
            false => None,
        };
        let author = AUTHORS.choose(&mut rng).copied().unwrap_or("Anonymous");
        let data = CommentData::new(gen_text(&mut rng), author);
        ids.push(repo.create(data, parent).await?);
    }
    let mut deleted = 0;
    for &id in &ids {
        if rng.gen_bool(opt.delete_probability) {
            repo.delete(id).await?;
            deleted += 1;
        }
    }
    tracing::info!(count = opt.count, deleted, "generated comments");

    let out = match opt.tree {
        true => serde_json::to_value(build_tree(repo.list().await?, config.max_depth))
            .context("serializing comment tree")?,
        false => store
            .backend()
            .load("comments")?
            .unwrap_or_else(|| serde_json::Value::Array(Vec::new())),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("formatting output")?
    );

    Ok(())
}
