//! Integration tests for mgrep
//!
//! These tests build real directory trees under a temp dir and search them
//! through the public API, comparing the serial and pooled searchers.

use clap::Parser;
use mgrep::config::{CliArgs, SearchConfig};
use mgrep::{
    ConcurrentSearcher, Done, FsSource, Match, MemorySource, NoopFilter, OptionsFilter, Searcher,
    SearchError, SerialSearcher, TreeShape, Walker, WriterSink,
};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn options(max_depth: usize) -> OptionsFilter {
    OptionsFilter {
        max_depth,
        max_size: 1024 * 1024,
        max_length: 1024,
        include: None,
        exclude: Vec::new(),
    }
}

fn search_with<T: Searcher>(searcher: &T, root: &Path, pattern: &str) -> Vec<Match> {
    let mut found: Vec<Match> = Vec::new();
    searcher
        .search(root, &Regex::new(pattern).unwrap(), &Done::new(), &mut found)
        .unwrap();
    found
}

fn keys(found: &[Match]) -> BTreeSet<(PathBuf, usize, usize, usize)> {
    found
        .iter()
        .map(|m| (m.path.clone(), m.line_number, m.start, m.end))
        .collect()
}

#[test]
fn test_two_file_example() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "foo bar\nfoo foo\n").unwrap();
    fs::write(dir.path().join("b.txt"), "baz\n").unwrap();

    let searcher = ConcurrentSearcher::new(Walker::new(FsSource::new()), NoopFilter, 4);
    let found = search_with(&searcher, dir.path(), "foo");

    assert_eq!(found.len(), 2);
    let a = dir.path().join("a.txt");
    assert!(found.iter().all(|m| m.path == a));
    assert_eq!((found[0].line_number, found[0].start, found[0].end), (1, 0, 3));
    assert_eq!((found[1].line_number, found[1].start, found[1].end), (2, 0, 3));
}

#[test]
fn test_max_depth_zero_prunes_subdirectory() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/match.txt"), "needle\n").unwrap();

    let pooled = ConcurrentSearcher::new(Walker::new(FsSource::new()), options(0), 4);
    assert!(search_with(&pooled, dir.path(), "needle").is_empty());

    let serial = SerialSearcher::new(Walker::new(FsSource::new()), options(0));
    assert!(search_with(&serial, dir.path(), "needle").is_empty());

    // One more level lets it through
    let pooled = ConcurrentSearcher::new(Walker::new(FsSource::new()), options(1), 4);
    assert_eq!(search_with(&pooled, dir.path(), "needle").len(), 1);
}

#[test]
fn test_filesystem_serial_and_pool_agree() {
    let dir = tempdir().unwrap();
    for d in 0..4 {
        let sub = dir.path().join(format!("d{d}")).join("inner");
        fs::create_dir_all(&sub).unwrap();
        for f in 0..5 {
            let body: String = (0..20)
                .map(|l| {
                    if (l + f + d) % 3 == 0 {
                        format!("line {l} has the Needle\n")
                    } else {
                        format!("line {l} is plain\n")
                    }
                })
                .collect();
            fs::write(sub.join(format!("f{f}.txt")), &body).unwrap();
            fs::write(dir.path().join(format!("d{d}/top{f}.txt")), &body).unwrap();
        }
    }

    let serial = SerialSearcher::new(Walker::new(FsSource::new()), NoopFilter);
    let expected = keys(&search_with(&serial, dir.path(), "Needle"));
    assert!(!expected.is_empty());

    for concurrency in [1, 2, 7] {
        let pooled = ConcurrentSearcher::new(Walker::new(FsSource::new()), NoopFilter, concurrency)
            .with_capacity(2);
        let found = search_with(&pooled, dir.path(), "Needle");
        assert_eq!(found.len(), expected.len());
        assert_eq!(keys(&found), expected);
    }
}

#[test]
fn test_empty_directory_terminates() {
    let dir = tempdir().unwrap();
    for capacity in [0, 1, 64] {
        let searcher = ConcurrentSearcher::new(Walker::new(FsSource::new()), NoopFilter, 8)
            .with_capacity(capacity);
        assert!(search_with(&searcher, dir.path(), ".").is_empty());
    }
}

#[test]
fn test_missing_root_is_the_only_fatal_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("not-here");

    let searcher = ConcurrentSearcher::new(Walker::new(FsSource::new()), NoopFilter, 4);
    let mut found: Vec<Match> = Vec::new();
    let err = searcher
        .search(&missing, &Regex::new("x").unwrap(), &Done::new(), &mut found)
        .unwrap_err();
    match err {
        SearchError::Root(scan) => assert!(scan.is_not_found()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_undecodable_file_is_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bin.dat"), [0x66, 0x6f, 0x6f, 0xff, 0xfe, b'\n']).unwrap();
    fs::write(dir.path().join("text.txt"), "foo\n").unwrap();

    let searcher = ConcurrentSearcher::new(Walker::new(FsSource::new()), NoopFilter, 2);
    let mut found: Vec<Match> = Vec::new();
    let stats = searcher
        .search(dir.path(), &Regex::new("foo").unwrap(), &Done::new(), &mut found)
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, dir.path().join("text.txt"));
    assert_eq!(stats.errors, 1);
    assert!(stats.completed);
}

#[test]
fn test_cli_options_end_to_end() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::create_dir_all(dir.path().join("target")).unwrap();
    fs::write(dir.path().join("src/main.rs"), "fn main() {}\n// TODO: more\n").unwrap();
    fs::write(dir.path().join("src/notes.txt"), "todo list\n").unwrap();
    fs::write(dir.path().join("target/gen.rs"), "// todo generated\n").unwrap();
    fs::write(dir.path().join("src/empty.rs"), "").unwrap();

    let root = dir.path().to_string_lossy().to_string();
    for concurrency in ["0", "4"] {
        let args = CliArgs::parse_from([
            "mgrep",
            "-c",
            concurrency,
            "--include",
            r"\.rs$",
            "--exclude",
            "/target/",
            "todo",
            root.as_str(),
        ]);
        let config = SearchConfig::from_args(args).unwrap();
        let searcher = config.build_searcher(FsSource::new());

        let mut found: Vec<Match> = Vec::new();
        let stats = searcher
            .search(&config.root, &config.pattern, &Done::new(), &mut found)
            .unwrap();

        // Case-insensitive by default; include/exclude applied to file paths
        assert_eq!(found.len(), 1, "concurrency {concurrency}");
        assert_eq!(found[0].path, dir.path().join("src/main.rs"));
        assert_eq!(found[0].line_number, 2);
        assert_eq!(found[0].matched(), "TODO");
        assert!(stats.skipped >= 3);
    }
}

#[test]
fn test_line_length_limit_drops_match() {
    let dir = tempdir().unwrap();
    let long = format!("{} needle\n", "x".repeat(50));
    fs::write(dir.path().join("a.txt"), format!("short needle\n{long}")).unwrap();

    let mut policy = options(10);
    policy.max_length = 20;
    let searcher = ConcurrentSearcher::new(Walker::new(FsSource::new()), policy, 2);
    let found = search_with(&searcher, dir.path(), "needle");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, "short needle");
}

#[test]
fn test_writer_sink_output() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "one\nhas two\n").unwrap();

    let searcher = SerialSearcher::new(Walker::new(FsSource::new()), NoopFilter);
    let mut sink = WriterSink::new(Vec::new());
    searcher
        .search(dir.path(), &Regex::new("two").unwrap(), &Done::new(), &mut sink)
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(out, format!("{}[2,5]:has two\n", file.display()));
}

#[test]
fn test_generated_tree_completeness() {
    let shape = TreeShape {
        depth: 3,
        dirs: 4,
        files: 3,
        lines: 10,
    };
    let source = MemorySource::generate("gen", &shape);

    let serial = SerialSearcher::new(Walker::new(&source), NoopFilter);
    let expected = keys(&search_with(&serial, Path::new("gen"), "qu(ick|artz)"));

    for (concurrency, capacity) in [(1, 0), (3, 1), (12, 8)] {
        let pooled = ConcurrentSearcher::new(Walker::new(&source), NoopFilter, concurrency)
            .with_capacity(capacity);
        let found = search_with(&pooled, Path::new("gen"), "qu(ick|artz)");
        assert_eq!(found.len(), expected.len());
        assert_eq!(keys(&found), expected);
    }
}

#[test]
fn test_deadline_cancels_search() {
    let shape = TreeShape {
        depth: 5,
        dirs: 5,
        files: 4,
        lines: 20,
    };
    let source = MemorySource::generate("big", &shape);
    let done = Done::new();
    let _deadline = done
        .cancel_after(std::time::Duration::from_millis(1))
        .unwrap();

    let searcher = ConcurrentSearcher::new(Walker::new(&source), NoopFilter, 4).with_capacity(2);
    let mut found: Vec<Match> = Vec::new();
    let stats = searcher
        .search(Path::new("big"), &Regex::new("o").unwrap(), &done, &mut found)
        .unwrap();

    // 3906 directories, 15624 files, 312480 lines: a 1ms deadline stops well short
    assert!(!stats.completed);
    assert!((found.len() as u64) < 312_480);
    assert_eq!(found.len() as u64, stats.matches);
}
