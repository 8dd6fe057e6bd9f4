use super::*;

use crate::internal::write_records;
use crate::support::Node;

use simple_sds::serialize;

use rand::Rng;

use std::fs;

//-----------------------------------------------------------------------------

// Kmers of the circular sequence, one per position, in the text format.
fn circular_kmers(text: &[u8], k: usize) -> (Vec<KMer>, Alphabet) {
    let alpha = Alphabet::new();
    let n = text.len();
    let mut kmers: Vec<KMer> = Vec::with_capacity(n);
    for i in 0..n {
        let label: String = (0..k).map(|j| text[(i + j) % n] as char).collect();
        let pred = text[(i + n - 1) % n] as char;
        let succ = text[(i + k) % n] as char;
        let line = format!("{} {}:0 {} {} {}:0", label, i, pred, succ, (i + 1) % n);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        kmers.push(KMer::new(&tokens, &alpha, 4).unwrap());
    }
    (kmers, alpha)
}

// The label of a path node in a circular sequence: the concatenation of the
// kmer labels at positions `start..start + order`.
fn path_label(text: &[u8], k: usize, start: usize, order: usize) -> String {
    let n = text.len();
    let mut result = String::with_capacity(k * order);
    for i in start..start + order {
        for j in 0..k {
            result.push(text[(i + j) % n] as char);
        }
    }
    result
}

//-----------------------------------------------------------------------------

#[test]
fn distinct_kmers_need_no_doubling() {
    let (mut kmers, alpha) = circular_kmers(b"GATTACA$", 2);
    let graph = build(&mut kmers, 2, &alpha);

    assert_eq!(graph.len(), kmers.len(), "Incorrect number of path nodes");
    assert!(graph.fully_sorted(), "Distinct kmers should be sorted immediately");
    assert_eq!(graph.order, 1, "Distinct kmers should not be extended");
}

#[test]
fn repeats_require_doubling() {
    // GA, AT, TT, and TA occur twice; the two occurrences of GA need
    // order 5 to diverge.
    let text = b"GATTAGATTA$";
    let (mut kmers, alpha) = circular_kmers(text, 2);
    let graph = build(&mut kmers, 2, &alpha);

    assert_eq!(graph.len(), kmers.len(), "Incorrect number of path nodes");
    assert!(graph.fully_sorted(), "The labels did not become unique");
    assert_eq!(graph.order, 5, "Incorrect maximum order");

    let mut orders: Vec<usize> = graph.paths.iter().map(|path| path.order()).collect();
    orders.sort_unstable();
    assert_eq!(orders, vec![1, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5], "Incorrect order distribution");

    // The paths are in label order and the labels are pairwise distinct.
    let labels: Vec<String> = graph.paths.iter()
        .map(|path| path_label(text, 2, Node::id(path.from) as usize, path.order()))
        .collect();
    for i in 1..labels.len() {
        assert!(labels[i - 1] < labels[i], "Labels {} and {} are out of order", labels[i - 1], labels[i]);
    }

    // The label lcps match a character comparison of the labels.
    assert_eq!(graph.path_lcps.len(), graph.len(), "Incorrect number of label lcps");
    assert_eq!(graph.path_lcps.get(0), 0, "The first label lcp is not 0");
    for i in 1..labels.len() {
        let truth = labels[i - 1].bytes().zip(labels[i].bytes()).take_while(|(a, b)| a == b).count();
        assert_eq!(graph.path_lcps.get(i) as usize, truth, "Incorrect label lcp between {} and {}", labels[i - 1], labels[i]);
    }
}

#[test]
fn degrees_and_alphabet() {
    let text = b"GATTAGATTA$";
    let (mut kmers, alpha) = circular_kmers(text, 2);
    let graph = build(&mut kmers, 2, &alpha);

    // Every position has one outgoing and one incoming edge.
    for path in graph.paths.iter() {
        assert_eq!(path.outdegree(), 1, "Incorrect outdegree for the path at {}", Node::id(path.from));
        assert_eq!(path.indegree(), 1, "Incorrect indegree for the path at {}", Node::id(path.from));
    }

    // Edge counts by the last character of the origin kmer:
    // $ from A$; A from GA, GA, TA, TA; G from AG, $G; T from AT, AT, TT, TT.
    assert_eq!(graph.alphabet.total(), kmers.len() as u64, "Incorrect total edge count");
    let truth: Vec<u64> = vec![0, 1, 5, 5, 7, 11, 11];
    for (i, value) in truth.iter().enumerate() {
        assert_eq!(graph.alphabet.cumulative(i), *value, "Incorrect cumulative count {}", i);
    }
}

// Kmers from explicit input lines with a single destination each.
fn kmers_from_lines(lines: &[&str]) -> (Vec<KMer>, Alphabet) {
    let alpha = Alphabet::new();
    let mut kmers = Vec::new();
    for line in lines.iter() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        kmers.push(KMer::new(&tokens, &alpha, 4).unwrap());
    }
    (kmers, alpha)
}

#[test]
fn branching_degrees() {
    // A diamond: A branches to C and G, both continue through T to the
    // terminator, and the sequence wraps. The two branch kmers share the
    // source position 0:0, so each edge must go to the kmer's own node.
    let lines = [
        "AC 0:0 $ T 1:0",
        "AG 0:0 $ T 2:0",
        "CT 1:0 A $ 3:0",
        "GT 2:0 A $ 3:0",
        "T$ 3:0 C,G A 4:0",
        "$A 4:0 T C,G 0:0",
    ];
    let (mut kmers, alpha) = kmers_from_lines(&lines);
    let graph = build(&mut kmers, 2, &alpha);

    assert_eq!(graph.len(), 6, "Incorrect number of path nodes");
    assert!(graph.fully_sorted(), "The labels did not become unique");

    // In label order: $A, AC, AG, CT, GT, T$. The branch node $A has two
    // successors; both CT and GT continue into T$.
    let outdegrees: Vec<usize> = graph.paths.iter().map(|path| path.outdegree()).collect();
    let indegrees: Vec<usize> = graph.paths.iter().map(|path| path.indegree()).collect();
    assert_eq!(outdegrees, vec![2, 1, 1, 1, 1, 1], "Incorrect outdegrees");
    assert_eq!(indegrees, vec![1, 1, 1, 1, 1, 2], "Incorrect indegrees");

    // 7 edges in total: the kmers sharing a source position are counted
    // for their own nodes only, not for the siblings.
    assert_eq!(graph.alphabet.total(), 7, "Incorrect total edge count");
    let truth: Vec<u64> = vec![0, 1, 3, 4, 5, 7, 7];
    for (i, value) in truth.iter().enumerate() {
        assert_eq!(graph.alphabet.cumulative(i), *value, "Incorrect cumulative count {}", i);
    }
}

#[test]
fn terminal_kmers_end_paths() {
    // A linear sequence: the last kmer has the terminal destination.
    let lines = [
        "AC 0:0 $ G 1:0",
        "CG 1:0 A $ 2:0",
        "G$ 2:0 C $ 18014398509481983:1023",
    ];
    let (mut kmers, alpha) = kmers_from_lines(&lines);
    assert!(kmers[2].sorted(), "The terminal destination did not mark the record");

    let graph = build(&mut kmers, 2, &alpha);
    assert_eq!(graph.len(), 3, "Incorrect number of path nodes");
    assert!(graph.fully_sorted(), "The labels did not become unique");

    // In label order: AC, CG, G$. The terminal node has no out-edges and
    // nothing enters the start of the sequence.
    let outdegrees: Vec<usize> = graph.paths.iter().map(|path| path.outdegree()).collect();
    let indegrees: Vec<usize> = graph.paths.iter().map(|path| path.indegree()).collect();
    assert_eq!(outdegrees, vec![1, 1, 0], "Incorrect outdegrees");
    assert_eq!(indegrees, vec![0, 1, 1], "Incorrect indegrees");
    assert_eq!(graph.alphabet.total(), 2, "Incorrect total edge count");
}

#[test]
fn empty_input() {
    let alpha = Alphabet::new();
    let mut kmers: Vec<KMer> = Vec::new();
    let graph = build(&mut kmers, 2, &alpha);
    assert!(graph.is_empty(), "Path nodes from an empty input");
    assert_eq!(graph.order, 0, "Incorrect order for an empty input");
    assert_eq!(graph.alphabet.total(), 0, "Edge counts from an empty input");
}

#[test]
fn serialize_lcp_from_build() {
    let (mut kmers, alpha) = circular_kmers(b"GATTAGATTA$", 2);
    let graph = build(&mut kmers, 2, &alpha);
    let _ = serialize::test(&graph.lcp, "builder-lcp", None, true);
}

//-----------------------------------------------------------------------------

#[test]
fn merge_sorted_path_files() {
    let mut rng = rand::thread_rng();

    // Random singleton path nodes with distinct first labels.
    let mut ranks: Vec<u32> = (0..300).collect();
    for i in (1..ranks.len()).rev() {
        ranks.swap(i, rng.gen_range(0..i + 1));
    }
    let mut truth: Vec<PathNode> = ranks.iter()
        .map(|rank| PathNode::from_ranks(&[*rank], &[*rank], *rank as u64, *rank as u64 + 1))
        .collect();
    truth.sort_unstable_by(|a, b| a.compare(b));

    // Distribute into sorted runs, with one empty file.
    let mut runs: Vec<Vec<PathNode>> = vec![Vec::new(); 4];
    for (i, node) in truth.iter().enumerate() {
        runs[i % 3].push(*node);
    }
    let mut filenames = Vec::new();
    for (i, run) in runs.iter().enumerate() {
        let filename = serialize::temp_file_name(&format!("merge-paths-{}", i));
        write_records(&filename, run).unwrap();
        filenames.push(filename);
    }

    let merged = merge_path_files(&filenames).unwrap();
    assert_eq!(merged, truth, "The merge does not produce the sorted sequence");

    for filename in filenames.iter() {
        fs::remove_file(filename).unwrap();
    }
}

#[test]
fn merge_missing_file() {
    let filenames = vec!["this-file-does-not-exist"];
    assert!(merge_path_files(&filenames).is_err(), "Merging a missing file should fail");
}

//-----------------------------------------------------------------------------
