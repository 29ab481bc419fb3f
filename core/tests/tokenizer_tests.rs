use std::io::Write;
use vsr_core::Tokenizer;

#[test]
fn it_normalizes_and_stems() {
    let words = Tokenizer::new().tokenize("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // NFKC keeps accents
    assert!(words.contains(&"café".to_string()));
}

#[test]
fn it_folds_compatibility_forms() {
    let words = Tokenizer::new().with_stemming(false).tokenize("ﬁle ＳＴＡＴＩＮ café");
    assert_eq!(words, vec!["file", "statin", "café"]);
}

#[test]
fn it_filters_stopwords() {
    let words = Tokenizer::new().tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn it_loads_stopword_file() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "# medical stopwords").unwrap();
    writeln!(f, "patient").unwrap();
    writeln!(f).unwrap();
    writeln!(f, "Study").unwrap();
    let tokenizer = Tokenizer::from_stopword_file(f.path()).unwrap().with_stemming(false);
    let words = tokenizer.tokenize("patient study of the statin");
    assert_eq!(words, vec!["of", "the", "statin"]);
}
