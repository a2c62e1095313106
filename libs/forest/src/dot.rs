use core::alloc::Allocator;
use core::fmt;
use core::ptr::NonNull;

use crate::node::{self, Node, Side};
use crate::raw::RawTree;

/// Renders a tree in graphviz `dot` format, see [`Tree::dot`](crate::Tree::dot).
pub struct Dot<'a, T, A: Allocator> {
    pub(crate) raw: &'a RawTree<T, A>,
}

fn id<T>(node: NonNull<Node<T>>) -> usize {
    node.as_ptr().addr()
}

impl<T: fmt::Debug, A: Allocator> Dot<'_, T, A> {
    /// Writes the label of `node` and the edges to its children.
    fn node_fmt(f: &mut fmt::Formatter<'_>, node: NonNull<Node<T>>) -> fmt::Result {
        let id = id(node);

        // Safety: `node` is reachable from the root of the borrowed tree
        unsafe {
            writeln!(
                f,
                r#"  {id} [label="{value:?} h={height}"];"#,
                value = node::value(node),
                height = node::height(node),
            )?;

            for side in [Side::Left, Side::Right] {
                if let Some(child) = node::child(node, side) {
                    writeln!(f, r#"  {id} -> {} [label="{side}"];"#, self::id(child))?;
                }
            }
        }

        Ok(())
    }

    /// Pre-order walk through the parent links, so degenerate trees need no stack.
    fn tree_fmt(&self, f: &mut fmt::Formatter<'_>, root: NonNull<Node<T>>) -> fmt::Result {
        let mut node = root;

        // Safety: all nodes reached are linked real nodes of the borrowed tree
        unsafe {
            'visit: loop {
                Self::node_fmt(f, node)?;

                if let Some(child) = node::left(node).or(node::right(node)) {
                    node = child;
                    continue;
                }

                // climb until we arrive from a left child whose parent has a right subtree
                loop {
                    let parent = node::parent(node).expect("linked node must have a parent");
                    if self.raw.is_sentinel(parent) {
                        return Ok(());
                    }
                    if node::left(parent) == Some(node)
                        && let Some(right) = node::right(parent)
                    {
                        node = right;
                        continue 'visit;
                    }
                    node = parent;
                }
            }
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Display for Dot<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("digraph {\n")?;
        if let Some(root) = self.raw.root() {
            writeln!(f, r#"  end [shape=point];"#)?;
            writeln!(f, r#"  end -> {} [label="root"];"#, id(root))?;
            self.tree_fmt(f, root)?;
        }
        f.write_str("}\n")
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Dot<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
