//! Tests for container tree placement, resizing, selection and movement.

use super::*;
use crate::config::Config;
use crate::geometry::{Direction, Rect};
use crate::window::{WindowHandle, WindowMeta};

fn gapless_config() -> Config {
    let mut config = Config::with_animations_disabled();
    config.gaps.inner_x = 0;
    config.gaps.inner_y = 0;
    config.border.size = 0;
    config
}

fn output_area() -> Rect {
    Rect::new(0, 0, 1280, 720)
}

/// Build a tree with a horizontal root covering 1280x720 and `n` confirmed
/// leaves appended in order.
fn tree_with_leaves(n: usize) -> (ContainerTree, ContainerId, Vec<ContainerId>) {
    let mut tree = ContainerTree::new();
    let root = tree.create_parent(output_area(), LayoutScheme::Horizontal, None, true);
    let mut leaves = Vec::new();
    for i in 0..n {
        let leaf = tree.create_space_for_window(root, None);
        tree.confirm_window(leaf, WindowHandle(i as u64 + 1), WindowMeta::default());
        leaves.push(leaf);
    }
    (tree, root, leaves)
}

fn committed_area(tree: &ContainerTree, id: ContainerId) -> Rect {
    tree.get(id).unwrap().effective_area()
}

#[test]
fn single_leaf_fills_the_output() {
    let (tree, _root, leaves) = tree_with_leaves(1);
    assert_eq!(committed_area(&tree, leaves[0]), Rect::new(0, 0, 1280, 720));
    // With zero gaps and no border the visible area equals the logical one.
    let config = gapless_config();
    assert_eq!(
        tree.visible_area(leaves[0], &config),
        Rect::new(0, 0, 1280, 720)
    );
}

#[test]
fn two_leaves_split_evenly() {
    let (tree, _root, leaves) = tree_with_leaves(2);
    assert_eq!(committed_area(&tree, leaves[0]), Rect::new(0, 0, 640, 720));
    assert_eq!(committed_area(&tree, leaves[1]), Rect::new(640, 0, 640, 720));
}

#[test]
fn three_leaves_ceil_split_with_remainder_on_last() {
    let (tree, _root, leaves) = tree_with_leaves(3);
    // ceil(1280/3) = 427 for all but the last, which absorbs the remainder.
    assert_eq!(committed_area(&tree, leaves[0]).width, 427);
    assert_eq!(committed_area(&tree, leaves[1]).width, 427);
    assert_eq!(committed_area(&tree, leaves[2]).width, 1280 - 2 * 427);
    assert_eq!(committed_area(&tree, leaves[1]).x, 427);
    assert_eq!(committed_area(&tree, leaves[2]).x, 854);
}

#[test]
fn tile_widths_sum_to_parent_extent() {
    for n in 1..=7 {
        let (tree, root, leaves) = tree_with_leaves(n);
        let total: i32 = leaves
            .iter()
            .map(|&leaf| committed_area(&tree, leaf).width)
            .sum();
        assert_eq!(total, tree.get(root).unwrap().logical_area.width);
    }
}

#[test]
fn inner_gaps_deflate_shared_edges_only() {
    let (tree, _root, leaves) = tree_with_leaves(2);
    let mut config = gapless_config();
    config.gaps.inner_x = 10;
    config.gaps.inner_y = 10;

    // Leaf A shares only its right edge; leaf B only its left.
    let a = tree.visible_area(leaves[0], &config);
    let b = tree.visible_area(leaves[1], &config);
    assert_eq!(a, Rect::new(0, 0, 635, 720));
    assert_eq!(b, Rect::new(645, 0, 635, 720));
}

#[test]
fn border_deflates_all_edges() {
    let (tree, _root, leaves) = tree_with_leaves(1);
    let mut config = gapless_config();
    config.border.size = 2;
    assert_eq!(
        tree.visible_area(leaves[0], &config),
        Rect::new(2, 2, 1276, 716)
    );
}

#[test]
fn resize_moves_the_shared_edge() {
    let (mut tree, _root, leaves) = tree_with_leaves(2);
    assert!(tree.resize(leaves[0], Direction::Right, 100));
    assert_eq!(committed_area(&tree, leaves[0]), Rect::new(0, 0, 740, 720));
    assert_eq!(committed_area(&tree, leaves[1]), Rect::new(740, 0, 540, 720));
}

#[test]
fn resize_left_shrinks_the_target() {
    let (mut tree, _root, leaves) = tree_with_leaves(2);
    assert!(tree.resize(leaves[0], Direction::Left, 100));
    assert_eq!(committed_area(&tree, leaves[0]).width, 540);
    assert_eq!(committed_area(&tree, leaves[1]).width, 740);
}

#[test]
fn resize_single_child_is_rejected() {
    let (mut tree, _root, leaves) = tree_with_leaves(1);
    assert!(!tree.resize(leaves[0], Direction::Right, 100));
    assert_eq!(committed_area(&tree, leaves[0]), Rect::new(0, 0, 1280, 720));
}

#[test]
fn resize_below_minimum_is_rejected() {
    let (mut tree, _root, leaves) = tree_with_leaves(2);
    // 640 - 600 = 40 < 50 minimum for the sibling.
    assert!(!tree.resize(leaves[0], Direction::Right, 600));
    assert_eq!(committed_area(&tree, leaves[0]).width, 640);
    assert_eq!(committed_area(&tree, leaves[1]).width, 640);
}

#[test]
fn resize_walks_up_to_the_matching_axis() {
    // Root is horizontal; a vertical resize on a leaf must resize the leaf's
    // column within... the root has no vertical parent, so it no-ops.
    let (mut tree, _root, leaves) = tree_with_leaves(2);
    assert!(!tree.resize(leaves[0], Direction::Down, 50));

    // Nest a vertical parent: wrap leaf 0, then a vertical resize inside it
    // works against its sibling in the column.
    let (mut tree, root, leaves) = tree_with_leaves(2);
    tree.handle_layout_scheme(leaves[0], LayoutScheme::Vertical);
    let column = tree.parent_of(leaves[0]).unwrap();
    assert_ne!(column, root);
    let second = tree.create_space_for_window(column, None);
    tree.confirm_window(second, WindowHandle(99), WindowMeta::default());

    assert!(tree.resize(leaves[0], Direction::Down, 60));
    assert_eq!(committed_area(&tree, leaves[0]).height, 420);
    assert_eq!(committed_area(&tree, second).height, 300);
    // Horizontal resize from inside the column still reaches the root axis.
    assert!(tree.resize(leaves[0], Direction::Right, 100));
    assert_eq!(tree.get(column).unwrap().logical_area.width, 740);
}

#[test]
fn select_next_walks_siblings() {
    let (tree, _root, leaves) = tree_with_leaves(3);
    assert_eq!(tree.handle_select(leaves[0], Direction::Right), Some(leaves[1]));
    assert_eq!(tree.handle_select(leaves[1], Direction::Right), Some(leaves[2]));
    assert_eq!(tree.handle_select(leaves[1], Direction::Left), Some(leaves[0]));
    assert_eq!(tree.handle_select(leaves[2], Direction::Right), None);
    assert_eq!(tree.handle_select(leaves[0], Direction::Left), None);
    // No vertical parent anywhere up the chain.
    assert_eq!(tree.handle_select(leaves[1], Direction::Up), None);
}

#[test]
fn select_descends_into_nearest_edge() {
    // [ A | [B stacked-on C vertically] ]; moving left from B or C lands on
    // A; moving right from A lands on the column's first leaf.
    let (mut tree, _root, leaves) = tree_with_leaves(2);
    tree.handle_layout_scheme(leaves[1], LayoutScheme::Vertical);
    let column = tree.parent_of(leaves[1]).unwrap();
    let lower = tree.create_space_for_window(column, None);
    tree.confirm_window(lower, WindowHandle(42), WindowMeta::default());

    assert_eq!(tree.handle_select(leaves[0], Direction::Right), Some(leaves[1]));
    assert_eq!(tree.handle_select(leaves[1], Direction::Left), Some(leaves[0]));
    assert_eq!(tree.handle_select(lower, Direction::Left), Some(leaves[0]));
    assert_eq!(tree.handle_select(leaves[1], Direction::Down), Some(lower));
    assert_eq!(tree.handle_select(lower, Direction::Up), Some(leaves[1]));
}

#[test]
fn select_prefers_far_edge_when_entering_against_the_axis() {
    // [ [A | B] | C ]: moving left from C should land on B, the far edge of
    // the matching-axis sibling, not A.
    let (mut tree, root, leaves) = tree_with_leaves(2);
    tree.handle_layout_scheme(leaves[0], LayoutScheme::Horizontal);
    let inner = tree.parent_of(leaves[0]).unwrap();
    assert_ne!(inner, root);
    let b = tree.create_space_for_window(inner, None);
    tree.confirm_window(b, WindowHandle(7), WindowMeta::default());

    assert_eq!(tree.handle_select(leaves[1], Direction::Left), Some(b));
}

#[test]
fn move_swaps_within_a_parent() {
    let (mut tree, root, leaves) = tree_with_leaves(3);
    let outcome = tree.move_in_tree(root, leaves[0], Direction::Right);
    assert!(outcome.moved);
    assert!(outcome.new_root.is_none());
    assert_eq!(
        tree.children_of(root),
        vec![leaves[1], leaves[0], leaves[2]]
    );
    // Round-trip restores the original order.
    let outcome = tree.move_in_tree(root, leaves[0], Direction::Left);
    assert!(outcome.moved);
    assert_eq!(
        tree.children_of(root),
        vec![leaves[0], leaves[1], leaves[2]]
    );
}

#[test]
fn move_against_the_root_axis_wraps_the_root() {
    let (mut tree, root, leaves) = tree_with_leaves(2);
    let outcome = tree.move_in_tree(root, leaves[0], Direction::Down);
    assert!(outcome.moved);
    let new_root = outcome.new_root.expect("root should have been wrapped");
    let new_root_data = tree.get(new_root).unwrap().as_parent().unwrap();
    assert_eq!(new_root_data.scheme, LayoutScheme::Vertical);
    // The old root sits on top, the moved leaf appended below.
    assert_eq!(new_root_data.children, vec![root, leaves[0]]);
    assert_eq!(tree.children_of(root), vec![leaves[1]]);
}

#[test]
fn move_up_prepends_to_the_wrapped_root() {
    let (mut tree, root, leaves) = tree_with_leaves(2);
    let outcome = tree.move_in_tree(root, leaves[1], Direction::Up);
    let new_root = outcome.new_root.unwrap();
    assert_eq!(
        tree.get(new_root).unwrap().as_parent().unwrap().children,
        vec![leaves[1], root]
    );
}

#[test]
fn move_along_the_root_axis_at_the_edge_is_a_no_op() {
    let (mut tree, root, leaves) = tree_with_leaves(2);
    let outcome = tree.move_in_tree(root, leaves[0], Direction::Left);
    assert!(!outcome.moved);
    assert_eq!(tree.children_of(root), vec![leaves[0], leaves[1]]);
}

#[test]
fn move_transplants_across_parents() {
    // [ A | column[B, C] ]: moving A right inserts it after B inside the
    // column (the selection walk finds B).
    let (mut tree, root, leaves) = tree_with_leaves(2);
    tree.handle_layout_scheme(leaves[1], LayoutScheme::Vertical);
    let column = tree.parent_of(leaves[1]).unwrap();
    let c = tree.create_space_for_window(column, None);
    tree.confirm_window(c, WindowHandle(3), WindowMeta::default());

    let outcome = tree.move_in_tree(root, leaves[0], Direction::Right);
    assert!(outcome.moved);
    assert_eq!(tree.children_of(column), vec![leaves[1], leaves[0], c]);
    // The root is left holding just the column.
    assert_eq!(tree.children_of(root), vec![column]);
}

#[test]
fn removing_the_last_leaf_cascades_empty_parents() {
    let (mut tree, root, leaves) = tree_with_leaves(2);
    tree.handle_layout_scheme(leaves[1], LayoutScheme::Vertical);
    let column = tree.parent_of(leaves[1]).unwrap();

    tree.remove_node(leaves[1]);
    tree.destroy(leaves[1]);
    // The now-empty column dissolved back into the root.
    assert!(!tree.contains(column));
    assert_eq!(tree.children_of(root), vec![leaves[0]]);
    // The survivor reclaims the whole area.
    assert_eq!(committed_area(&tree, leaves[0]).width, 1280);
}

#[test]
fn parent_pointers_stay_consistent() {
    let (mut tree, root, leaves) = tree_with_leaves(3);
    tree.move_in_tree(root, leaves[0], Direction::Right);
    tree.handle_layout_scheme(leaves[2], LayoutScheme::Stacking);

    for id in tree.ids() {
        if let Some(parent) = tree.parent_of(id) {
            assert!(
                tree.children_of(parent).contains(&id),
                "{id} missing from its parent's child list"
            );
        }
    }
}

#[test]
fn layout_scheme_toggle_on_single_child_mutates_in_place() {
    let (mut tree, root, leaves) = tree_with_leaves(1);
    assert!(tree.handle_layout_scheme(leaves[0], LayoutScheme::Vertical));
    // No wrapper created: root itself mutated.
    assert_eq!(tree.parent_of(leaves[0]), Some(root));
    assert_eq!(
        tree.get(root).unwrap().as_parent().unwrap().scheme,
        LayoutScheme::Vertical
    );
}

#[test]
fn layout_scheme_on_multi_child_wraps_the_target() {
    let (mut tree, root, leaves) = tree_with_leaves(2);
    assert!(tree.handle_layout_scheme(leaves[0], LayoutScheme::Tabbing));
    let wrapper = tree.parent_of(leaves[0]).unwrap();
    assert_ne!(wrapper, root);
    assert_eq!(
        tree.get(wrapper).unwrap().as_parent().unwrap().scheme,
        LayoutScheme::Tabbing
    );
    // The wrapper keeps the leaf's old tile.
    assert_eq!(tree.get(wrapper).unwrap().logical_area.width, 640);
}

#[test]
fn stacked_parents_hand_children_the_full_tile() {
    let (mut tree, _root, leaves) = tree_with_leaves(2);
    tree.handle_layout_scheme(leaves[0], LayoutScheme::Stacking);
    let wrapper = tree.parent_of(leaves[0]).unwrap();
    let second = tree.create_space_for_window(wrapper, None);
    tree.confirm_window(second, WindowHandle(5), WindowMeta::default());

    assert_eq!(committed_area(&tree, leaves[0]), committed_area(&tree, second));
    assert_eq!(committed_area(&tree, leaves[0]).width, 640);
}

#[test]
fn scheme_cycle_visits_all_four() {
    let mut scheme = LayoutScheme::Horizontal;
    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(scheme);
        scheme = scheme.next();
    }
    assert_eq!(
        seen,
        vec![
            LayoutScheme::Horizontal,
            LayoutScheme::Vertical,
            LayoutScheme::Tabbing,
            LayoutScheme::Stacking
        ]
    );
    assert_eq!(scheme, LayoutScheme::Horizontal);
}

#[test]
fn leaf_at_finds_the_tile_under_a_point() {
    let (tree, root, leaves) = tree_with_leaves(2);
    assert_eq!(tree.leaf_at(root, 100, 100), Some(leaves[0]));
    assert_eq!(tree.leaf_at(root, 1000, 100), Some(leaves[1]));
    assert_eq!(tree.leaf_at(root, 2000, 100), None);
}

#[test]
fn container_for_window_is_unique() {
    let (tree, _root, leaves) = tree_with_leaves(3);
    assert_eq!(tree.container_for_window(WindowHandle(2)), Some(leaves[1]));
    assert_eq!(tree.container_for_window(WindowHandle(9)), None);
}

#[test]
fn take_pending_area_flushes_once() {
    let mut config = gapless_config();
    config.gaps.inner_x = 0;
    let (mut tree, _root, leaves) = tree_with_leaves(2);

    // Placement left pending areas on both leaves.
    assert!(tree.take_pending_area(leaves[0], &config).is_some());
    assert!(tree.take_pending_area(leaves[0], &config).is_none());
    assert_eq!(tree.get(leaves[0]).unwrap().logical_area.width, 640);
}

#[test]
fn ids_are_never_reused() {
    let mut tree = ContainerTree::new();
    let root = tree.create_parent(output_area(), LayoutScheme::Horizontal, None, true);
    let first = tree.create_space_for_window(root, None);
    tree.remove_node(first);
    tree.destroy(first);
    let second = tree.create_space_for_window(root, None);
    assert_ne!(first, second);
    assert!(second > first);
}
