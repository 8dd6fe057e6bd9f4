use super::*;

use crate::support::{Alphabet, Node};

use rand::Rng;

//-----------------------------------------------------------------------------

fn node_from_tokens(tokens: &[&str], successor: usize) -> KMer {
    let alpha = Alphabet::new();
    KMer::new(tokens, &alpha, successor).unwrap()
}

#[test]
fn from_kmer() {
    let mut kmer = node_from_tokens(&["ACG", "5:3", "T", "A", "6:0"], 4);
    kmer.key = Key::replace(kmer.key, 42);
    let node = PathNode::from_kmer(&kmer);

    assert_eq!(node.order(), 1, "Incorrect order");
    assert_eq!(node.lcp(), 0, "Incorrect lcp");
    assert_eq!(node.first_label(), &[42], "Incorrect first label");
    assert_eq!(node.last_label(), &[42], "Incorrect last label");
    assert_eq!(node.predecessors(), 1 << 4, "Incorrect predecessors");
    assert_eq!(node.from, Node::encode(5, 3), "Incorrect source position");
    assert_eq!(node.to, Node::encode(6, 0), "Incorrect destination position");
    assert!(!node.sorted(), "A fresh node should not be sorted");
}

#[test]
fn packed_fields() {
    let mut node = PathNode::from_ranks(&[1, 2, 3], &[1, 2, 5], 0, 1);
    assert_eq!(node.order(), 3, "Incorrect order");
    assert_eq!(node.lcp(), 2, "Incorrect lcp");

    node.set_predecessors(0xA5);
    assert_eq!(node.predecessors(), 0xA5, "Incorrect predecessors");
    assert!(node.has_predecessor(0), "Predecessor 0 should be present");
    assert!(!node.has_predecessor(1), "Predecessor 1 should not be present");
    assert_eq!(node.order(), 3, "Setting predecessors changed the order");

    let other = PathNode::from_ranks(&[7], &[7], 2, 3);
    let mut with_preds = other;
    with_preds.set_predecessors(0x18);
    node.add_predecessors(&with_preds);
    assert_eq!(node.predecessors(), 0xBD, "Incorrect combined predecessors");

    node.set_lcp(1);
    assert_eq!(node.lcp(), 1, "Incorrect lcp after update");
    assert_eq!(node.order(), 3, "Setting the lcp changed the order");
    assert_eq!(node.predecessors(), 0xBD, "Setting the lcp changed the predecessors");
}

#[test]
fn sorted_flag() {
    let mut node = PathNode::from_ranks(&[4], &[4], 10, 20);
    assert!(!node.sorted(), "A fresh node should not be sorted");
    node.make_sorted();
    assert!(node.sorted(), "The node should be sorted after marking");
}

//-----------------------------------------------------------------------------

#[test]
fn fuse_nodes() {
    let left = PathNode::from_ranks(&[4], &[4], 100, 200);
    let right = PathNode::from_ranks(&[9], &[11], 200, 300);
    let fused = PathNode::fuse(&left, &right);

    assert_eq!(fused.order(), 2, "Incorrect fused order");
    assert_eq!(fused.lcp(), 1, "Incorrect fused lcp");
    assert_eq!(fused.first_label(), &[4, 9], "Incorrect fused first label");
    assert_eq!(fused.last_label(), &[4, 11], "Incorrect fused last label");
    assert_eq!(fused.from, 100, "Incorrect fused source");
    assert_eq!(fused.to, 300, "Incorrect fused destination");
    assert_eq!(fused.predecessors(), left.predecessors(), "Fusion does not take predecessors from the left node");
}

#[test]
fn fuse_saturates_lcp() {
    let left = PathNode::from_ranks(&[4], &[4], 100, 200);
    let right = PathNode::from_ranks(&[9], &[9], 200, 300);
    let fused = PathNode::fuse(&left, &right);
    assert_eq!(fused.order(), 2, "Incorrect fused order");
    assert_eq!(fused.lcp(), 1, "The lcp of a singleton range should saturate below the order");
}

#[test]
#[should_panic]
fn fuse_capacity() {
    let left = PathNode::from_ranks(&[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5], 100, 200);
    let right = PathNode::from_ranks(&[6, 7, 8, 9], &[6, 7, 8, 9], 200, 300);
    let _ = PathNode::fuse(&left, &right);
}

#[test]
fn fuse_associativity() {
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let first: Vec<u32> = (0..2).map(|_| rng.gen_range(0..100)).collect();
        let second: Vec<u32> = (0..2).map(|_| rng.gen_range(0..100)).collect();
        let third: Vec<u32> = (0..2).map(|_| rng.gen_range(0..100)).collect();
        let a = PathNode::from_ranks(&first, &first, 10, 20);
        let b = PathNode::from_ranks(&second, &second, 20, 30);
        let c = PathNode::from_ranks(&third, &third, 30, 40);

        let left_first = PathNode::fuse(&PathNode::fuse(&a, &b), &c);
        let right_first = PathNode::fuse(&a, &PathNode::fuse(&b, &c));
        assert_eq!(left_first, right_first, "Fusion is not associative");
    }
}

//-----------------------------------------------------------------------------

#[test]
fn compare_first_labels() {
    let a = PathNode::from_ranks(&[1, 2], &[1, 2], 0, 1);
    let b = PathNode::from_ranks(&[1, 2, 5], &[1, 2, 5], 1, 2);
    let c = PathNode::from_ranks(&[1, 3], &[1, 3], 2, 3);

    assert_eq!(a.compare(&b), Ordering::Less, "A proper prefix should be smaller");
    assert_eq!(b.compare(&a), Ordering::Greater, "An extension should be larger");
    assert_eq!(a.compare(&c), Ordering::Less, "Incorrect comparison on diverging labels");
    assert_eq!(b.compare(&c), Ordering::Less, "Incorrect comparison on diverging labels");
    assert_eq!(a.compare(&a), Ordering::Equal, "A node should be equal to itself");
}

#[test]
fn compare_last_labels() {
    let a = PathNode::from_ranks(&[1, 2], &[1, 2], 0, 1);
    let b = PathNode::from_ranks(&[1, 2, 5], &[1, 2, 5], 1, 2);
    let c = PathNode::from_ranks(&[1, 3], &[1, 3], 2, 3);

    assert_eq!(a.compare_last(&b), Ordering::Greater, "A proper prefix should be larger on last labels");
    assert_eq!(b.compare_last(&a), Ordering::Less, "An extension should be smaller on last labels");
    assert_eq!(a.compare_last(&c), Ordering::Less, "Incorrect comparison on diverging labels");
    assert_eq!(a.compare_last(&a), Ordering::Equal, "A node should be equal to itself");
}

// Generate a random node with order in 1..=4 and ranks below 8, giving
// plenty of prefix collisions.
fn random_node(rng: &mut impl Rng, from: u64) -> PathNode {
    let order = rng.gen_range(1..=4);
    let first: Vec<u32> = (0..order).map(|_| rng.gen_range(0..8)).collect();
    let mut last = first.clone();
    let tail = last.len() - 1;
    last[tail] = rng.gen_range(first[tail]..8);
    PathNode::from_ranks(&first, &last, from, from + 1)
}

#[test]
fn compare_is_total() {
    let mut rng = rand::thread_rng();
    let nodes: Vec<PathNode> = (0..30).map(|i| random_node(&mut rng, i)).collect();

    for a in nodes.iter() {
        for b in nodes.iter() {
            assert_eq!(a.compare(b), b.compare(a).reverse(), "Comparison is not antisymmetric");
            assert_eq!(a.compare_last(b), b.compare_last(a).reverse(), "Last label comparison is not antisymmetric");
            for c in nodes.iter() {
                if a.compare(b) == Ordering::Less && b.compare(c) == Ordering::Less {
                    assert_eq!(a.compare(c), Ordering::Less, "Comparison is not transitive");
                }
                if a.compare_last(b) == Ordering::Less && b.compare_last(c) == Ordering::Less {
                    assert_eq!(a.compare_last(c), Ordering::Less, "Last label comparison is not transitive");
                }
            }
        }
    }
}

//-----------------------------------------------------------------------------

#[test]
fn intersecting_ranges() {
    let a = PathNode::from_ranks(&[1, 2], &[1, 5], 0, 1);
    let b = PathNode::from_ranks(&[1, 4], &[2, 0], 1, 2);
    let c = PathNode::from_ranks(&[2, 0], &[2, 3], 2, 3);

    assert!(a.intersect(&b), "Overlapping ranges should intersect");
    assert!(b.intersect(&a), "Intersection should be symmetric");
    assert!(!a.intersect(&c), "Disjoint ranges should not intersect");
    assert!(b.intersect(&c), "Ranges sharing an endpoint should intersect");
}

#[test]
fn intersect_on_prefix_ties() {
    // The range of b starts at the smallest completion of [1, 2] and the
    // range of a ends at the largest, so the ranges overlap.
    let a = PathNode::from_ranks(&[1, 1], &[1, 2], 0, 1);
    let b = PathNode::from_ranks(&[1, 2, 3], &[1, 3, 0], 1, 2);
    assert!(a.intersect(&b), "Prefix ties should intersect");

    let c = PathNode::from_ranks(&[1, 3, 1], &[1, 4, 0], 2, 3);
    assert!(!a.intersect(&c), "Ranges beyond the prefix should not intersect");
}

#[test]
fn rank_lcps() {
    let a = PathNode::from_ranks(&[1, 2, 3], &[1, 2, 4], 0, 1);
    let b = PathNode::from_ranks(&[1, 2, 6], &[1, 3, 0], 1, 2);

    assert_eq!(a.min_lcp(&b), 2, "Incorrect minimal rank lcp");
    assert_eq!(a.max_lcp(&b), 2, "Incorrect maximal rank lcp");

    let c = PathNode::from_ranks(&[2, 0, 0], &[2, 0, 1], 2, 3);
    assert_eq!(a.min_lcp(&c), 0, "Incorrect minimal rank lcp for diverging nodes");
    assert_eq!(b.max_lcp(&c), 0, "Incorrect maximal rank lcp for diverging nodes");
}

//-----------------------------------------------------------------------------

#[test]
fn degrees() {
    let mut node = PathNode::from_ranks(&[3], &[3], 5, 6);
    node.init_degree();
    assert_eq!(node.outdegree(), 0, "Outdegree was not zeroed");
    assert_eq!(node.indegree(), 0, "Indegree was not zeroed");

    for _ in 0..3 {
        node.increment_outdegree();
    }
    for _ in 0..2 {
        node.increment_indegree();
    }
    assert_eq!(node.outdegree(), 3, "Incorrect outdegree");
    assert_eq!(node.indegree(), 2, "Incorrect indegree");
}

//-----------------------------------------------------------------------------
