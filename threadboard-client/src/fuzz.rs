#![cfg(test)]

use std::{collections::HashSet, panic::AssertUnwindSafe};

use chrono::{Duration, TimeZone, Utc};
use threadboard_mock_store::MockStore;

use crate::{
    api::{Comment, CommentId, RecordPatch, RecordStore, StoreChange, Time, Uuid, Where},
    build_tree, CommentNode, KvBackend, MemoryKv, TableStore,
};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                let _ = tracing_subscriber::fmt::try_init();
            }
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

fn base_time() -> Time {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn id(n: u8) -> CommentId {
    CommentId(Uuid::from_u128(n as u128 % 16))
}

fn comment(n: u8, parent: Option<u8>, secs: u8) -> Comment {
    Comment {
        id: id(n),
        text: format!("text {secs}"),
        author: format!("author {}", secs % 3),
        created_at: base_time() + Duration::seconds(secs as i64),
        edited_at: None,
        parent_id: parent.map(id),
    }
}

async fn run_op<S: RecordStore>(s: &S, (kind, a, b, flag): (u8, u8, u8, bool)) -> String {
    let res = match kind % 7 {
        0 => s
            .insert(comment(a, flag.then_some(b), b))
            .await
            .map(|()| String::from("inserted")),
        1 => {
            let patch = RecordPatch {
                text: Some(format!("edited {b}")),
                author: flag.then(|| format!("author {}", b % 3)),
                edited_at: Some(base_time() + Duration::seconds(b as i64)),
            };
            s.update(id(a), patch).await.map(|r| format!("{r}"))
        }
        2 => s
            .update(id(a), RecordPatch::tombstone(base_time()))
            .await
            .map(|r| format!("{r}")),
        3 => s.delete(id(a)).await.map(|r| format!("{r}")),
        4 => s.get(id(a)).await.map(|r| format!("{r:?}")),
        5 => {
            let w = match b % 3 {
                0 => Where::ParentId(id(a)),
                1 => Where::CreatedAt(base_time() + Duration::seconds(a as i64)),
                _ => Where::Author(format!("author {}", a % 3)),
            };
            s.list_where(&w).await.map(|r| format!("{r:?}"))
        }
        _ => s
            .count_where(&Where::ParentId(id(a)))
            .await
            .map(|r| format!("{r}")),
    };
    match res {
        Ok(r) => r,
        Err(_) => String::from("error"),
    }
}

fn drain(feed: &mut futures::channel::mpsc::UnboundedReceiver<StoreChange>) -> Vec<StoreChange> {
    let mut changes = Vec::new();
    while let Ok(c) = feed.try_recv() {
        changes.push(c);
    }
    changes
}

do_tokio_test!(
    table_store_behaves_like_mock_store,
    Vec<(u8, u8, u8, bool)>,
    |ops: Vec<(u8, u8, u8, bool)>| async move {
        let mock = MockStore::new();
        let table = TableStore::open(MemoryKv::new())
            .expect("opening empty table");
        let mut mock_feed = mock.subscribe();
        let mut table_feed = table.subscribe();
        for op in ops {
            tracing::trace!(?op, "running op");
            let expected = run_op(&mock, op).await;
            let got = run_op(&table, op).await;
            assert_eq!(got, expected, "op {op:?} diverged");
            assert_eq!(drain(&mut table_feed), drain(&mut mock_feed));
        }
        assert_eq!(
            table.list_all().await.expect("listing table store"),
            mock.list_all().await.expect("listing mock store")
        );

        let backend = MemoryKv::new();
        if let Some(persisted) = table.backend().load("comments").expect("reading table") {
            backend.seed("comments", persisted);
        }
        let reopened = TableStore::open(backend).expect("reopening table");
        assert_eq!(
            reopened.list_all().await.expect("listing reopened table"),
            mock.list_all().await.expect("listing mock store")
        );
    }
);

fn check_subtree(node: CommentNode<'_>, max_depth: usize, seen: &mut HashSet<CommentId>) -> usize {
    assert!(node.depth() < max_depth, "{node:?} is too deep");
    assert!(seen.insert(node.id), "{node:?} appears twice");
    let mut descendants = 0;
    let mut last = None;
    for child in node.children() {
        assert_eq!(child.parent_id, Some(node.id));
        assert_eq!(child.depth(), node.depth() + 1);
        let key = (child.created_at, child.id);
        assert!(
            last.map(|l| l < key).unwrap_or(true),
            "replies out of order"
        );
        last = Some(key);
        descendants += 1 + check_subtree(child, max_depth, seen);
    }
    assert_eq!(node.child_count(), descendants);
    descendants
}

#[test]
fn tree_covers_every_comment_once() {
    bolero::check!()
        .with_type::<(u8, Vec<(Option<u8>, u8)>)>()
        .for_each(|(depth, links): &(u8, Vec<(Option<u8>, u8)>)| {
            let max_depth = 1 + *depth as usize % 6;
            let comments = links
                .iter()
                .take(16)
                .enumerate()
                .map(|(i, &(parent, secs))| comment(i as u8, parent, secs % 8))
                .collect::<Vec<_>>();
            let n = comments.len();
            let tree = build_tree(comments, max_depth);

            assert_eq!(tree.len(), n);
            let mut seen = HashSet::new();
            let mut last = None;
            for root in tree.roots() {
                assert_eq!(root.depth(), 0);
                let key = (std::cmp::Reverse(root.created_at), root.id);
                assert!(last.map(|l| l < key).unwrap_or(true), "roots out of order");
                last = Some(key);
                check_subtree(root, max_depth, &mut seen);
            }
            assert_eq!(seen.len(), n);
            assert_eq!(tree.iter().map(|c| c.id).collect::<HashSet<_>>(), seen);
        })
}
