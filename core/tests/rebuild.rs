use autumn_core::render::strip_timestamp;
use autumn_core::{Autumn, Config};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn autumn(root: &Path, output: &str, exts: &[&str], split: bool) -> Autumn {
    let config = Config::builder(root)
        .output_file(output)
        .extensions(exts.iter().copied())
        .split_by_extension(split)
        .watch_delay("100ms")
        .max_watch_delay("1s")
        .build()
        .unwrap();
    Autumn::new(config)
}

fn section_headings(body: &str) -> Vec<String> {
    body.lines()
        .filter(|l| l.starts_with("## "))
        .map(|l| l.trim_start_matches("## ").to_string())
        .collect()
}

fn canonical_root() -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

#[test]
fn gitignored_file_is_left_out() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "print(1)");
    write(&root, "b.ts", "let x=1;");
    write(&root, ".gitignore", "b.ts\n");

    autumn(&root, "DOC.md", &[".py", ".ts"], false)
        .update_documentation()
        .unwrap();

    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert_eq!(section_headings(&body), vec!["a.py"]);
    assert!(body.contains("```python\nprint(1)\n```"));
    assert!(!body.contains("let x=1;"));
}

#[test]
fn docignore_negation_cannot_override_gitignore() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "print(1)");
    write(&root, "b.ts", "let x=1;");
    write(&root, ".gitignore", "b.ts\n");
    write(&root, ".docignore", "!b.ts\n");

    autumn(&root, "DOC.md", &[".py", ".ts"], false)
        .update_documentation()
        .unwrap();

    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert_eq!(section_headings(&body), vec!["a.py"]);
}

#[test]
fn rerun_without_changes_is_identical_apart_from_timestamp() {
    let (_dir, root) = canonical_root();
    write(&root, "src/lib.rs", "pub fn f() {}\n");
    write(&root, "src/main.rs", "fn main() {}\n");
    write(&root, "tools/gen.py", "print('gen')\n");
    let autumn = autumn(&root, "DOC.md", &[".rs", ".py"], false);

    autumn.update_documentation().unwrap();
    let first = fs::read_to_string(root.join("DOC.md")).unwrap();
    thread::sleep(Duration::from_millis(5));
    autumn.update_documentation().unwrap();
    let second = fs::read_to_string(root.join("DOC.md")).unwrap();

    assert_eq!(strip_timestamp(&first), strip_timestamp(&second));
    assert_eq!(
        section_headings(&first),
        vec!["src/lib.rs", "src/main.rs", "tools/gen.py"]
    );
}

#[test]
fn split_mode_writes_one_document_per_extension() {
    let (_dir, root) = canonical_root();
    write(&root, "app.py", "x = 1\n");
    write(&root, "pkg/util.py", "y = 2\n");
    write(&root, "main.go", "package main\n");

    let summary = autumn(&root, "DOC.md", &[".py", ".go"], true)
        .update_documentation()
        .unwrap();

    let mut documents = summary.documents.clone();
    documents.sort();
    assert_eq!(documents, vec![root.join("DOC_go.md"), root.join("DOC_py.md")]);
    assert!(!root.join("DOC.md").exists());

    let py = fs::read_to_string(root.join("DOC_py.md")).unwrap();
    let go = fs::read_to_string(root.join("DOC_go.md")).unwrap();
    assert_eq!(section_headings(&py), vec!["app.py", "pkg/util.py"]);
    assert_eq!(section_headings(&go), vec!["main.go"]);
}

#[test]
fn split_sections_union_matches_single_document() {
    let (_dir, root) = canonical_root();
    write(&root, "b.py", "b\n");
    write(&root, "a.go", "package a\n");
    write(&root, "c/d.rs", "fn d() {}\n");

    autumn(&root, "ALL.md", &[".py", ".go", ".rs"], false)
        .update_documentation()
        .unwrap();
    let split = autumn(&root, "PART.md", &[".py", ".go", ".rs"], true)
        .update_documentation()
        .unwrap();
    assert_eq!(split.documents.len(), 3);

    let single = section_headings(&fs::read_to_string(root.join("ALL.md")).unwrap());
    let mut union: Vec<String> = split
        .documents
        .iter()
        .flat_map(|p| section_headings(&fs::read_to_string(p).unwrap()))
        .collect();
    union.sort();
    assert_eq!(single, union);
}

#[test]
fn own_output_is_never_aggregated() {
    let (_dir, root) = canonical_root();
    write(&root, "README.md", "# readme\n");
    let autumn = autumn(&root, "DOC.md", &[".md"], false);

    autumn.update_documentation().unwrap();
    autumn.update_documentation().unwrap();

    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert_eq!(section_headings(&body), vec!["README.md"]);
}

#[test]
fn empty_tree_still_produces_a_document() {
    let (_dir, root) = canonical_root();
    let summary = autumn(&root, "DOC.md", &[".py"], false)
        .update_documentation()
        .unwrap();
    assert_eq!(summary.files_rendered, 0);
    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert!(section_headings(&body).is_empty());
    assert!(body.contains("*This file is automatically maintained by Autumn.*"));
}

#[test]
fn builtin_ignores_hold_regardless_of_project_rules() {
    let (_dir, root) = canonical_root();
    write(&root, "keep.py", "ok\n");
    write(&root, "node_modules/dep/index.py", "no\n");
    write(&root, "__pycache__/x.py", "no\n");
    write(&root, ".venv/lib/site.py", "no\n");
    write(&root, ".docignore", "!node_modules/\n!__pycache__/\n");

    autumn(&root, "DOC.md", &[".py"], false)
        .update_documentation()
        .unwrap();
    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert_eq!(section_headings(&body), vec!["keep.py"]);
}

#[test]
fn ignore_files_are_reread_each_pass() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "a\n");
    write(&root, "b.py", "b\n");
    let autumn = autumn(&root, "DOC.md", &[".py"], false);

    autumn.update_documentation().unwrap();
    write(&root, ".docignore", "b.py\n");
    autumn.update_documentation().unwrap();

    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert_eq!(section_headings(&body), vec!["a.py"]);
}

#[test]
fn unwritable_output_fails_the_pass() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "a\n");
    // A directory where the output file should be.
    fs::create_dir_all(root.join("DOC.md")).unwrap();

    let result = autumn(&root, "DOC.md", &[".py"], false).update_documentation();
    assert!(result.is_err());
}

#[test]
fn watch_rebuilds_after_edit() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "print(1)\n");
    let autumn = autumn(&root, "DOC.md", &[".py"], false);
    autumn.update_documentation().unwrap();

    let rebuilds = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let (r, e) = (rebuilds.clone(), errors.clone());
    let handle = autumn
        .start_watch_with(move |result| match result {
            Ok(_) => {
                r.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => e.lock().unwrap().push(err.to_string()),
        })
        .unwrap();

    write(&root, "b.py", "print(2)\n");
    let deadline = Instant::now() + Duration::from_secs(5);
    while rebuilds.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
    }
    handle.stop();

    assert!(errors.lock().unwrap().is_empty());
    assert!(rebuilds.load(Ordering::SeqCst) >= 1);
    let body = fs::read_to_string(root.join("DOC.md")).unwrap();
    assert_eq!(section_headings(&body), vec!["a.py", "b.py"]);
}

#[test]
fn manual_trigger_burst_coalesces() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "print(1)\n");
    let config = Config::builder(&root)
        .output_file("DOC.md")
        .extensions([".py"])
        .watch_delay("300ms")
        .max_watch_delay("2s")
        .build()
        .unwrap();
    let autumn = Autumn::new(config);

    let rebuilds = Arc::new(AtomicUsize::new(0));
    let r = rebuilds.clone();
    let handle = autumn
        .start_watch_with(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    for _ in 0..5 {
        handle.trigger();
        thread::sleep(Duration::from_millis(40));
    }
    thread::sleep(Duration::from_millis(800));
    handle.stop();
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);
}

#[test]
fn split_mode_drops_documents_for_vanished_extensions() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "a = 1\n");
    write(&root, "b.go", "package b\n");
    let autumn = autumn(&root, "DOC.md", &[".py", ".go"], true);

    autumn.update_documentation().unwrap();
    assert!(root.join("DOC_go.md").exists());

    fs::remove_file(root.join("b.go")).unwrap();
    let summary = autumn.update_documentation().unwrap();
    assert_eq!(summary.documents, vec![root.join("DOC_py.md")]);
    assert!(!root.join("DOC_go.md").exists());

    fs::remove_file(root.join("a.py")).unwrap();
    let summary = autumn.update_documentation().unwrap();
    assert!(summary.documents.is_empty());
    assert!(!root.join("DOC_py.md").exists());
}

#[test]
fn watch_recovers_after_failed_write() {
    let (_dir, root) = canonical_root();
    write(&root, "a.py", "print(1)\n");
    fs::create_dir_all(root.join("DOC.md")).unwrap();
    let autumn = autumn(&root, "DOC.md", &[".py"], false);

    let results = Arc::new(Mutex::new(Vec::new()));
    let r = results.clone();
    let handle = autumn
        .start_watch_with(move |result| r.lock().unwrap().push(result.is_ok()))
        .unwrap();

    let wait_for = |count: usize| {
        let deadline = Instant::now() + Duration::from_secs(5);
        while results.lock().unwrap().len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
    };

    handle.trigger();
    wait_for(1);
    fs::remove_dir(root.join("DOC.md")).unwrap();
    handle.trigger();
    wait_for(2);
    handle.stop();

    let results = results.lock().unwrap();
    assert_eq!(results.first(), Some(&false));
    assert_eq!(results.last(), Some(&true));
    assert!(root.join("DOC.md").is_file());
}
