//! Edge case tests for fos-range
//!
//! Error conditions, stale ranges and iterator misuse.

use std::cell::RefCell;
use std::rc::Rc;

use fos_range::dom::{DomTree, NodeId};
use fos_range::{DocumentRange, RangeError, RangeEvent, RangeTreeIterator, create_range};

fn hello_world() -> (DomTree, NodeId, NodeId) {
    let mut tree = DomTree::new();
    let p = tree.create_element("p");
    let text = tree.create_text("Hello world");
    tree.append_child(tree.root(), p).unwrap();
    tree.append_child(p, text).unwrap();
    (tree, p, text)
}

fn range(tree: &DomTree, a: NodeId, ao: usize, b: NodeId, bo: usize) -> DocumentRange {
    let mut range = create_range(tree);
    range.set_start_and_end(tree, a, ao, b, bo).unwrap();
    range
}

// ============================================================================
// Boundary validation
// ============================================================================

#[test]
fn test_offset_past_length() {
    let (tree, _, text) = hello_world();
    let mut r = create_range(&tree);
    assert_eq!(
        r.set_start(&tree, text, 99).unwrap_err(),
        RangeError::IndexSize {
            offset: 99,
            length: 11
        }
    );
    // The range is unchanged
    assert_eq!(r.start_container(), tree.root());
}

#[test]
fn test_doctype_is_not_a_boundary() {
    let (mut tree, _, _) = hello_world();
    let doctype = tree.create_doctype("html");
    let first = tree.first_child(tree.root()).unwrap();
    tree.insert_before(tree.root(), doctype, Some(first)).unwrap();

    let mut r = create_range(&tree);
    assert_eq!(
        r.set_start(&tree, doctype, 0).unwrap_err(),
        RangeError::InvalidNodeType
    );
}

#[test]
fn test_doctype_cannot_enter_a_fragment() {
    let (mut tree, p, text) = hello_world();
    let doctype = tree.create_doctype("html");
    tree.insert_before(tree.root(), doctype, Some(p)).unwrap();

    let root = tree.root();
    let mut r = range(&tree, root, 0, text, 5);
    assert!(matches!(
        r.clone_contents(&mut tree),
        Err(RangeError::HierarchyRequest(_))
    ));
    assert!(matches!(
        r.extract_contents(&mut tree),
        Err(RangeError::HierarchyRequest(_))
    ));
    // Nothing was moved
    assert_eq!(tree.parent(doctype), Some(root));
    assert_eq!(tree.text_content(p), "Hello world");
}

#[test]
fn test_range_from_another_document() {
    let (tree, _, text) = hello_world();
    let (other, _, _) = hello_world();
    let r = range(&tree, text, 0, text, 5);
    assert_eq!(r.text(&other).unwrap_err(), RangeError::WrongDocument);
}

#[test]
fn test_detached_range_rejects_use() {
    let (tree, _, text) = hello_world();
    let mut r = range(&tree, text, 0, text, 5);
    r.detach();
    assert!(r.is_detached());
    assert!(matches!(
        r.set_end(&tree, text, 2),
        Err(RangeError::InvalidState(_))
    ));
    assert!(matches!(r.text(&tree), Err(RangeError::InvalidState(_))));
}

#[test]
fn test_range_goes_stale_after_outside_mutation() {
    let (mut tree, _, text) = hello_world();
    let r = range(&tree, text, 2, text, 9);
    tree.delete_data(text, 0, 8).unwrap();

    assert!(!r.is_valid(&tree));
    assert_eq!(r.text(&tree).unwrap_err(), RangeError::StaleRange);
}

#[test]
fn test_compare_node_without_parent() {
    let (tree, _, text) = hello_world();
    let r = range(&tree, text, 0, text, 5);
    assert_eq!(
        r.compare_node(&tree, tree.root()).unwrap_err(),
        RangeError::NotFound("node has no parent")
    );
}

#[test]
fn test_union_of_distant_ranges() {
    let (tree, _, text) = hello_world();
    let a = range(&tree, text, 0, text, 2);
    let b = range(&tree, text, 6, text, 8);
    assert_eq!(
        a.union(&tree, &b).unwrap_err(),
        RangeError::RangesDoNotIntersect
    );
}

// ============================================================================
// Content operations
// ============================================================================

#[test]
fn test_insert_ancestor_of_start() {
    let (mut tree, p, text) = hello_world();
    let mut r = range(&tree, text, 1, text, 3);
    assert!(matches!(
        r.insert_node(&mut tree, p),
        Err(RangeError::HierarchyRequest(_))
    ));
}

#[test]
fn test_surround_across_structure() {
    let mut tree = DomTree::new();
    let p1 = tree.create_element("p");
    let p2 = tree.create_element("p");
    let a = tree.create_text("first");
    let b = tree.create_text("second");
    tree.append_child(tree.root(), p1).unwrap();
    tree.append_child(tree.root(), p2).unwrap();
    tree.append_child(p1, a).unwrap();
    tree.append_child(p2, b).unwrap();

    let mut r = range(&tree, a, 2, b, 3);
    assert!(!r.can_surround_contents(&tree).unwrap());
    let span = tree.create_element("span");
    assert_eq!(
        r.surround_contents(&mut tree, span).unwrap_err(),
        RangeError::BadBoundaryPoints
    );

    let text_parent = tree.create_text("x");
    assert_eq!(
        r.surround_contents(&mut tree, text_parent).unwrap_err(),
        RangeError::InvalidNodeType
    );
}

#[test]
fn test_surround_inside_text() {
    let (mut tree, p, text) = hello_world();
    let mut r = range(&tree, text, 6, text, 11);
    let b = tree.create_element("b");
    r.surround_contents(&mut tree, b).unwrap();

    assert_eq!(tree.child_count(p), 2);
    assert_eq!(tree.text_content(b), "world");
    assert_eq!(tree.text_content(p), "Hello world");
    assert_eq!(r.text(&tree).unwrap(), "world");
}

// ============================================================================
// Iterator misuse
// ============================================================================

#[test]
fn test_iterator_remove_is_checked() {
    let (mut tree, p, text) = hello_world();
    let r = range(&tree, text, 0, text, 6);
    let mut iter = RangeTreeIterator::new(&tree, &r).unwrap();

    assert_eq!(
        iter.remove(&mut tree).unwrap_err(),
        RangeError::InvalidState("iterator has no current node")
    );
    assert_eq!(iter.next(&tree), Some(text));
    iter.remove(&mut tree).unwrap();
    assert_eq!(tree.text_content(p), "world");
    assert_eq!(
        iter.remove(&mut tree).unwrap_err(),
        RangeError::InvalidState("current node was already removed")
    );

    iter.detach();
    assert_eq!(iter.next(&tree), None);
}

// ============================================================================
// Listeners
// ============================================================================

#[test]
fn test_listeners_see_changes_and_detach() {
    let (tree, _, text) = hello_world();
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut r = create_range(&tree);

    let sink = Rc::clone(&events);
    let id = r.on_change(move |event| sink.borrow_mut().push(*event));
    r.set_start_and_end(&tree, text, 1, text, 4).unwrap();
    r.collapse(&tree, true).unwrap();
    r.detach();

    let seen = events.borrow();
    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], RangeEvent::BoundaryChange { .. }));
    assert_eq!(seen[2], RangeEvent::Detach);
    assert!(!r.remove_listener(id));
}

#[test]
fn test_removed_listener_is_silent() {
    let (tree, _, text) = hello_world();
    let count = Rc::new(RefCell::new(0));
    let mut r = create_range(&tree);

    let sink = Rc::clone(&count);
    let id = r.on_change(move |_| *sink.borrow_mut() += 1);
    r.set_start(&tree, text, 2).unwrap();
    assert!(r.remove_listener(id));
    r.set_end(&tree, text, 5).unwrap();

    assert_eq!(*count.borrow(), 1);
}
