use std::{cmp::Reverse, collections::HashMap, fmt, ops::Deref};

use serde::ser::SerializeStruct;

use crate::api::{Comment, CommentId};

#[derive(Clone, Debug)]
struct Node {
    comment: Comment,
    depth: usize,
    child_count: usize,
    children: Vec<usize>,
}

/// Flat comments arranged as a forest, ready for display
///
/// Nodes live in an arena and only refer to each other by index, so that malformed parent links
/// can never turn into an infinite structure. [`CommentNode`] is the borrowed view over one of
/// them.
#[derive(Clone, Debug, Default)]
pub struct CommentTree {
    nodes: Vec<Node>,
    index: HashMap<CommentId, usize>,
    roots: Vec<usize>,
    // depth-first, in display order
    order: Vec<usize>,
    max_depth: usize,
}

/// Arrange `comments` into a tree at most `max_depth` levels deep
///
/// Replies that would land at depth `max_depth` or below are shown as additional roots instead,
/// as are replies whose parent is missing or whose ancestry loops on itself. Roots are sorted
/// newest first, replies oldest first.
pub fn build_tree(comments: Vec<Comment>, max_depth: usize) -> CommentTree {
    let n = comments.len();
    let index = comments
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect::<HashMap<_, _>>();
    let parents = comments
        .iter()
        .map(|c| c.parent_id.and_then(|p| index.get(&p).copied()))
        .collect::<Vec<_>>();
    let chain_depths = resolve_chain_depths(&parents);

    let mut depths = vec![0; n];
    let mut roots = Vec::new();
    let mut children = vec![Vec::new(); n];
    for (i, c) in comments.iter().enumerate() {
        match (c.parent_id, parents[i]) {
            (None, _) => roots.push(i),
            (Some(parent_id), None) => {
                tracing::debug!(
                    id = ?c.id,
                    ?parent_id,
                    "parent of comment not found, showing it as a root"
                );
                roots.push(i);
            }
            (Some(_), Some(p)) => match chain_depths[p] {
                Some(parent_depth) if parent_depth + 1 < max_depth => {
                    children[p].push(i);
                    depths[i] = parent_depth + 1;
                }
                Some(_) => roots.push(i),
                None => {
                    tracing::warn!(
                        id = ?c.id,
                        "comment ancestry contains a cycle, showing it as a root"
                    );
                    roots.push(i);
                }
            },
        }
    }

    roots.sort_by_key(|&i| (Reverse(comments[i].created_at), comments[i].id));
    for siblings in children.iter_mut() {
        siblings.sort_by_key(|&i| (comments[i].created_at, comments[i].id));
    }

    let mut order = Vec::with_capacity(n);
    let mut stack = roots.iter().rev().copied().collect::<Vec<_>>();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev());
    }
    debug_assert_eq!(
        order.len(),
        n,
        "some comments are not reachable from the roots"
    );

    let mut child_counts = vec![0; n];
    for &i in order.iter().rev() {
        child_counts[i] = children[i].iter().map(|&c| 1 + child_counts[c]).sum();
    }

    let nodes = comments
        .into_iter()
        .zip(depths)
        .zip(child_counts)
        .zip(children)
        .map(|(((comment, depth), child_count), children)| Node {
            comment,
            depth,
            child_count,
            children,
        })
        .collect();

    CommentTree {
        nodes,
        index,
        roots,
        order,
        max_depth,
    }
}

/// Number of parent hops from each comment up to the first comment with no (known) parent
///
/// `None` for comments whose chain of parents never reaches such a comment, because it loops.
/// Each comment is walked over at most once.
fn resolve_chain_depths(parents: &[Option<usize>]) -> Vec<Option<usize>> {
    let mut depths: Vec<Option<Option<usize>>> = vec![None; parents.len()];
    let mut on_path = vec![false; parents.len()];
    let mut path = Vec::new();
    for start in 0..parents.len() {
        if depths[start].is_some() {
            continue;
        }
        let mut cur = start;
        // depth of the last comment pushed to the path
        let top = loop {
            on_path[cur] = true;
            path.push(cur);
            match parents[cur] {
                None => break Some(0),
                Some(p) => match depths[p] {
                    Some(resolved) => break resolved.map(|d| d + 1),
                    None if on_path[p] => break None,
                    None => cur = p,
                },
            }
        };
        let mut depth = top;
        for i in path.drain(..).rev() {
            depths[i] = Some(depth);
            on_path[i] = false;
            depth = depth.map(|d| d + 1);
        }
    }
    // every entry got resolved by the walk above
    depths.into_iter().map(Option::flatten).collect()
}

impl CommentTree {
    pub fn roots(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> {
        self.roots
            .iter()
            .map(move |&idx| CommentNode { tree: self, idx })
    }

    /// All comments, depth-first in display order
    pub fn iter(&self) -> impl ExactSizeIterator<Item = CommentNode<'_>> {
        self.order
            .iter()
            .map(move |&idx| CommentNode { tree: self, idx })
    }

    pub fn get(&self, id: CommentId) -> Option<CommentNode<'_>> {
        self.index
            .get(&id)
            .map(|&idx| CommentNode { tree: self, idx })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Clone, Copy)]
pub struct CommentNode<'a> {
    tree: &'a CommentTree,
    idx: usize,
}

impl<'a> CommentNode<'a> {
    fn node(&self) -> &'a Node {
        &self.tree.nodes[self.idx]
    }

    pub fn comment(&self) -> &'a Comment {
        &self.node().comment
    }

    pub fn depth(&self) -> usize {
        self.node().depth
    }

    /// Number of replies below this comment, at any depth
    pub fn child_count(&self) -> usize {
        self.node().child_count
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = CommentNode<'a>> {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&idx| CommentNode { tree, idx })
    }

    pub fn can_reply(&self) -> bool {
        self.depth() + 1 < self.tree.max_depth
    }

    /// Whether `author` (usually the saved author name) wrote this comment
    pub fn is_owned_by(&self, author: &str) -> bool {
        !self.is_tombstone() && self.author == author
    }
}

impl Deref for CommentNode<'_> {
    type Target = Comment;

    fn deref(&self) -> &Comment {
        self.comment()
    }
}

impl fmt::Debug for CommentNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentNode")
            .field("comment", self.comment())
            .field("depth", &self.depth())
            .field("child_count", &self.child_count())
            .finish()
    }
}

impl serde::Serialize for CommentNode<'_> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let c = self.comment();
        let mut node = s.serialize_struct("CommentNode", 9)?;
        node.serialize_field("id", &c.id)?;
        node.serialize_field("text", &c.text)?;
        node.serialize_field("author", &c.author)?;
        node.serialize_field("createdAt", &c.created_at)?;
        node.serialize_field("editedAt", &c.edited_at)?;
        node.serialize_field("parentId", &c.parent_id)?;
        node.serialize_field("depth", &self.depth())?;
        node.serialize_field("childCount", &self.child_count())?;
        node.serialize_field("children", &self.children().collect::<Vec<_>>())?;
        node.end()
    }
}

impl serde::Serialize for CommentTree {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.roots())
    }
}
