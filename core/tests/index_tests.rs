use std::collections::BTreeSet;
use vsr_core::{Config, Corpus, DocId, Error, IndexBuilder, IndexSummary, ProjectionKind};

fn toks(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

fn synthetic_corpus(n: usize) -> Corpus {
    Corpus::from_tokens((0..n).map(|i| {
        let len = 5 + i % 4;
        let words = (0..len).map(|j| format!("w{}", (i * 7 + j * 3) % 30)).collect();
        (format!("doc-{i}"), words)
    }))
}

fn config() -> Config {
    Config { tiers: 3, dimensions: 128, seed: Some(17), ..Config::default() }
}

#[test]
fn tfidf_vectors_are_vocabulary_aligned() {
    let index = IndexBuilder::build(config(), synthetic_corpus(40)).unwrap();
    let vocab = index.vocabulary();
    for doc in index.documents().iter() {
        assert_eq!(doc.tfidf.len(), vocab.len());
        for (i, term) in vocab.terms().iter().enumerate() {
            if !doc.tokens.contains(term) {
                assert_eq!(doc.tfidf[i], 0.0);
            }
        }
        let n = doc.tfidf.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((doc.norm - n).abs() < 1e-5);
    }
}

#[test]
fn ubiquitous_term_has_zero_idf() {
    let corpus = Corpus::from_tokens(vec![
        ("0", toks("common alpha")),
        ("1", toks("common beta beta")),
        ("2", toks("common alpha gamma")),
    ]);
    let index = IndexBuilder::build(config(), corpus).unwrap();
    let inv = index.inverted();
    assert_eq!(inv.idf("common"), 0.0);
    // df(alpha) = 2 > df(gamma) = 1
    assert!(inv.idf("alpha") <= inv.idf("gamma"));
    assert!((inv.idf("gamma") - 3.0f32.ln()).abs() < 1e-6);
}

#[test]
fn posting_lists_match_occurrences() {
    let corpus = synthetic_corpus(25);
    let docs = corpus.docs.clone();
    let index = IndexBuilder::build(config(), corpus).unwrap();
    for (term, list) in index.inverted().iter() {
        let expected: Vec<DocId> = docs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.tokens.iter().any(|t| t == term))
            .map(|(i, _)| i as DocId)
            .collect();
        let actual: Vec<DocId> = list.doc_ids().collect();
        assert_eq!(actual, expected, "term {term}");
        assert!(list.postings.iter().all(|p| p.tf > 0.0 && p.tf <= 1.0));
    }
    assert!(matches!(index.inverted().posting_list("w999"), Err(Error::TermNotFound(_))));
}

#[test]
fn tiers_partition_every_posting_list() {
    let index = IndexBuilder::build(config(), synthetic_corpus(30)).unwrap();
    for (term, list) in index.inverted().iter() {
        let tiers = index.tiered().tiers(term).unwrap();
        assert_eq!(tiers.len(), 3);
        let mut flat: Vec<DocId> = tiers.iter().flatten().map(|p| p.doc_id).collect();
        flat.sort_unstable();
        assert_eq!(flat, list.doc_ids().collect::<Vec<_>>());
        let min_first = tiers[0].iter().map(|p| p.tf).fold(f32::INFINITY, f32::min);
        assert!(tiers[1..].iter().flatten().all(|p| p.tf <= min_first));
    }
}

#[test]
fn clusters_cover_collection_without_overlap() {
    let index = IndexBuilder::build(config(), synthetic_corpus(50)).unwrap();
    let clusters = index.clusters();
    assert_eq!(clusters.len(), 8); // ceil(sqrt(50))

    let mut seen: BTreeSet<DocId> = clusters.leaders().iter().copied().collect();
    for (_, members) in clusters.iter() {
        for &m in members {
            assert!(seen.insert(m), "document {m} appears twice");
        }
    }
    assert_eq!(seen, (0..50).collect::<BTreeSet<DocId>>());
}

#[test]
fn identical_documents_share_a_signature() {
    let corpus = Corpus::from_tokens(vec![
        ("0", toks("statin breast cancer")),
        ("1", toks("fried food")),
        ("2", toks("statin breast cancer")),
    ]);
    for kind in [ProjectionKind::Gaussian, ProjectionKind::Bipolar] {
        let index = IndexBuilder::build(Config { projection: kind, ..config() }, corpus.clone()).unwrap();
        let docs = index.documents();
        let a = &docs.get(0).unwrap().signature;
        let b = &docs.get(2).unwrap().signature;
        assert_eq!(a.hamming(b), 0);
        assert_eq!(a.len(), 128);
    }
}

#[test]
fn explicit_leaders_and_bad_leader_counts() {
    let index = IndexBuilder::new(config(), synthetic_corpus(5))
        .unwrap()
        .with_leaders(vec![0, 1, 2, 3, 4])
        .run(&vsr_core::NoEmbeddings { dim: 4 }, &vsr_core::Evaluation::disabled())
        .unwrap();
    assert!(index.clusters().iter().all(|(_, m)| m.is_empty()));

    let err = IndexBuilder::build(Config { leaders: Some(6), ..config() }, synthetic_corpus(5)).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    let err = IndexBuilder::new(Config { leaders: Some(6), ..config() }, synthetic_corpus(5)).err().unwrap();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn word_vectors_feed_document_embeddings() {
    let mut wv = vsr_core::WordVectors::new(2);
    wv.insert("statin", vec![1.0, 0.0]).unwrap();
    wv.insert("cancer", vec![0.0, 1.0]).unwrap();
    let corpus = Corpus::from_tokens(vec![("0", toks("statin cancer")), ("1", toks("fried food"))]);
    let index = IndexBuilder::new(config(), corpus)
        .unwrap()
        .run(&wv, &vsr_core::Evaluation::disabled())
        .unwrap();
    assert_eq!(index.documents().get(0).unwrap().embedding, vec![0.5, 0.5]);
    assert_eq!(index.documents().get(1).unwrap().embedding, vec![0.0, 0.0]);
}

#[test]
fn build_passes_are_timed_when_measuring() {
    let eval = vsr_core::Evaluation::new(true, false);
    IndexBuilder::new(config(), synthetic_corpus(10))
        .unwrap()
        .run(&vsr_core::NoEmbeddings { dim: 4 }, &eval)
        .unwrap();
    let report = eval.report();
    let labels: Vec<&str> = report.modes["BUILD"].iter().map(|r| r.label.as_str()).collect();
    assert!(labels.contains(&"inverted index"));
    assert!(labels.contains(&"total"));
}

#[test]
fn summary_reports_structure() {
    let index = IndexBuilder::build(config(), synthetic_corpus(16)).unwrap();
    let summary = IndexSummary::of(&index);
    assert_eq!(summary.num_docs, 16);
    assert_eq!(summary.vocabulary_size, index.vocabulary().len());
    assert_eq!(summary.num_tiers, 3);
    assert_eq!(summary.lsh_dimensions, 128);
    assert_eq!(summary.num_leaders, 4);
    let total: usize = summary.tier_postings.iter().sum();
    let postings: usize = index.inverted().iter().map(|(_, l)| l.len()).sum();
    assert_eq!(total, postings);
    assert!(summary.to_string().contains("vocabulary size"));
}
