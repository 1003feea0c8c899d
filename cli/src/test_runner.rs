use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;
use viewer::tree::ControlAction;
use viewer::{Activation, NoteView, Player, RenderNode, Renderer};

#[derive(Debug, Deserialize)]
pub struct ExpectedFinding {
    /// Substring that must appear in the finding message.
    pub contains: String,

    /// If set, the finding's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Property keys in declaration order. An empty list expects no panel.
    #[serde(default)]
    pub expect_properties: Option<Vec<String>>,

    /// Exact decoded values, keyed by property name.
    #[serde(default)]
    pub expect_values: BTreeMap<String, toml::Value>,

    /// Seconds each seek control sends to the player, in document order.
    #[serde(default)]
    pub expect_seek_seconds: Option<Vec<u64>>,

    /// Targets of ordinary links, in document order.
    #[serde(default)]
    pub expect_links: Option<Vec<String>>,

    /// `[[...]]` tokens, in document order.
    #[serde(default)]
    pub expect_wiki_links: Option<Vec<String>>,

    /// Video ids of embedded players, in document order.
    #[serde(default)]
    pub expect_videos: Option<Vec<String>>,

    /// Whether the first rendered node is a suppressed title heading.
    #[serde(default)]
    pub expect_title_suppressed: Option<bool>,

    /// Lint findings. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_findings: Option<Vec<ExpectedFinding>>,
}

/// Parse a `.test.md` file into its TOML config and note source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    if !content.starts_with("---") {
        return Err("missing opening --- header delimiter".into());
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- header delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

/// Collects the seconds of every seek it receives.
struct SeekLog(Rc<RefCell<Vec<u64>>>);

impl Player for SeekLog {
    fn seek_to(&mut self, seconds: u64, _allow_seek_ahead: bool) {
        self.0.borrow_mut().push(seconds);
    }

    fn play(&mut self) {}
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("header error: {}", e)),
    };

    let description = config.description.clone();
    match check_note(&config, source) {
        Ok(()) => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
        Err(reason) => fail(description, reason),
    }
}

/// Render `source` and compare every stated expectation.
fn check_note(config: &TestConfig, source: &str) -> Result<(), String> {
    let seeks = Rc::new(RefCell::new(Vec::new()));
    let mut view = NoteView::new(Renderer::default());
    let rendered = view.load(source).clone();
    view.mount_player(Box::new(SeekLog(Rc::clone(&seeks))));

    if let Some(expected) = &config.expect_properties {
        let actual: Vec<&str> = rendered
            .properties
            .iter()
            .flat_map(|panel| panel.rows.iter().map(|row| row.key.as_str()))
            .collect();
        compare("properties", expected, &actual)?;
    }

    if !config.expect_values.is_empty() {
        let note = watchless::Note::parse(source);
        for (key, expected) in &config.expect_values {
            let actual = note
                .properties
                .get(key)
                .ok_or_else(|| format!("property `{}` is missing", key))?;
            let actual = toml::Value::try_from(actual)
                .map_err(|e| format!("property `{}`: {}", key, e))?;
            if &actual != expected {
                return Err(format!(
                    "value mismatch for `{}`\n  expected: {}\n  actual:   {}",
                    key, expected, actual
                ));
            }
        }
    }

    if let Some(expected) = &config.expect_seek_seconds {
        let ids: Vec<usize> = rendered.tree.seek_controls().map(|c| c.id).collect();
        for id in ids {
            match view.activate(id) {
                Ok(Activation::Seek { .. }) => {}
                Ok(other) => return Err(format!("control #{} did not seek: {:?}", id, other)),
                Err(e) => return Err(format!("control #{} failed: {}", id, e)),
            }
        }
        compare("seek seconds", expected, &seeks.borrow())?;
    }

    if let Some(expected) = &config.expect_links {
        let actual: Vec<&str> = rendered
            .tree
            .controls
            .iter()
            .filter(|c| c.action == ControlAction::Navigate)
            .map(|c| c.href.as_str())
            .collect();
        compare("links", expected, &actual)?;
    }

    if let Some(expected) = &config.expect_wiki_links {
        compare("wiki links", expected, &rendered.tree.wiki_links())?;
    }

    if let Some(expected) = &config.expect_videos {
        compare("videos", expected, &rendered.tree.video_ids())?;
    }

    if let Some(expected) = config.expect_title_suppressed {
        let actual = rendered.tree.nodes.first() == Some(&RenderNode::Suppressed);
        if actual != expected {
            return Err(format!(
                "expected title suppressed = {}, got {}",
                expected, actual
            ));
        }
    }

    if let Some(expected) = &config.expect_findings {
        check_findings(source, expected)?;
    }

    Ok(())
}

fn compare<E, A>(what: &str, expected: &[E], actual: &[A]) -> Result<(), String>
where
    E: PartialEq<A> + std::fmt::Debug,
    A: std::fmt::Debug,
{
    if expected.len() == actual.len() && expected.iter().zip(actual).all(|(e, a)| e == a) {
        Ok(())
    } else {
        Err(format!(
            "{} mismatch\n  expected: {:?}\n  actual:   {:?}",
            what, expected, actual
        ))
    }
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

fn check_findings(source: &str, expected: &[ExpectedFinding]) -> Result<(), String> {
    let findings = watchless::lint::check(source, 0);

    if findings.len() != expected.len() {
        let actual_msgs: Vec<String> = findings
            .iter()
            .map(|f| format!("  - {}", f.message))
            .collect();
        return Err(format!(
            "expected {} finding(s), got {}\n  actual findings:\n{}",
            expected.len(),
            findings.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in findings.iter().zip(expected).enumerate() {
        if !actual.message.contains(&expected.contains) {
            return Err(format!(
                "finding[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, actual.message
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Err(format!(
                    "finding[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    Ok(())
}

/// `.test.md` files keyed by category: the folder holding them, relative to
/// the discovery root. Files directly in the root have category "".
type Categories = BTreeMap<String, Vec<PathBuf>>;

fn discover(root: &Path) -> Categories {
    let mut categories = Categories::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for path in entries.flatten().map(|entry| entry.path()) {
            if path.is_dir() {
                pending.push(path);
            } else if is_test_file(&path) {
                categories.entry(category_of(&dir, root)).or_default().push(path);
            }
        }
    }
    categories.values_mut().for_each(|files| files.sort());
    categories
}

fn is_test_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".test.md"))
}

/// Slash-joined on every platform.
fn category_of(dir: &Path, root: &Path) -> String {
    let Ok(relative) = dir.strip_prefix(root) else {
        return String::new();
    };
    relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn category_name(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Print the categories under `path` with their test counts.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }
    match category_listing(&discover(path)) {
        Some(listing) => eprint!("available categories:\n{listing}"),
        None => eprintln!("no .test.md files found in {}", path.display()),
    }
}

fn category_listing(categories: &Categories) -> Option<String> {
    if categories.is_empty() {
        return None;
    }
    let listing = categories
        .iter()
        .map(|(category, files)| {
            format!("  {} ({} tests)\n", category_name(category), files.len())
        })
        .collect();
    Some(listing)
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Bold = 1,
    Red = 31,
    Green = 32,
}

fn paint(text: &str, style: Style, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{text}\x1b[0m", style as u8)
    }
}

fn result_label(result: &TestResult) -> &str {
    result.description.as_deref().unwrap_or_else(|| {
        result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_suffix(".test.md"))
            .unwrap_or("?")
    })
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let groups: Vec<(String, Vec<PathBuf>)> = if path.is_file() {
        vec![(String::new(), vec![path.to_path_buf()])]
    } else {
        let all_categories = discover(path);
        if all_categories.is_empty() {
            eprintln!("no .test.md files found in {}", path.display());
            return 1;
        }
        select_categories(all_categories, categories)
    };

    if groups.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();
    let single = path.is_file();

    for (cat, files) in &groups {
        if !single {
            eprintln!();
            eprintln!("{}", paint(category_name(cat), Style::Bold, no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    let label = paint("PASS", Style::Green, no_color);
                    eprintln!("  {}  {}", label, result_label(&result));
                }
                TestOutcome::Fail(_) => {
                    let label = paint("FAIL", Style::Red, no_color);
                    eprintln!("  {}  {}", label, result_label(&result));
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    let failed = failures.len();
    eprintln!();
    if failed == 0 {
        let ok = paint("ok", Style::Green, no_color);
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let failed_label = paint("FAILED", Style::Red, no_color);
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            failed_label,
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn select_categories(
    all_categories: Categories,
    requested: &[String],
) -> Vec<(String, Vec<PathBuf>)> {
    if requested.is_empty() {
        return all_categories.into_iter().collect();
    }

    let mut selected = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let mut found = false;
        for (cat, files) in &all_categories {
            if cat == req || cat.starts_with(&prefix) {
                selected.insert(cat.clone(), files.clone());
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all_categories
                    .keys()
                    .map(|k| category_name(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_note_are_split() {
        let (config, source) = parse_test_file(
            "---\ndescription = \"d\"\nexpect_videos = []\n---\n---\ntags: [a]\n---\nBody\n",
        )
        .unwrap();
        assert_eq!(config.description.as_deref(), Some("d"));
        assert_eq!(source, "---\ntags: [a]\n---\nBody\n");
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(parse_test_file("# just a note").is_err());
    }

    #[test]
    fn expectations_are_checked() {
        let (config, source) = parse_test_file(
            "---\nexpect_properties = [\"tags\"]\nexpect_values = { tags = [\"a\", \"b\"] }\nexpect_seek_seconds = [754]\nexpect_links = [\"https://example.com\"]\nexpect_wiki_links = [\"[[W]]\"]\nexpect_title_suppressed = true\n---\n---\ntags: [a, b]\n---\n# T\n\n[12:34](#t) [more](https://example.com)\n\nsee [[W]]\n",
        )
        .unwrap();
        assert!(check_note(&config, source).is_ok());
    }

    #[test]
    fn mismatch_reports_reason() {
        let (config, source) =
            parse_test_file("---\nexpect_seek_seconds = [1]\n---\n[0:02](#t)\n").unwrap();
        let reason = check_note(&config, source).unwrap_err();
        assert!(reason.contains("seek seconds mismatch"), "{reason}");
    }

    #[test]
    fn findings_are_matched_by_line() {
        let (config, source) = parse_test_file(
            "---\nexpect_findings = [{ contains = \"not a JSON array\", line = 2 }]\n---\n---\ntags: [it's, fine]\n---\n",
        )
        .unwrap();
        assert!(check_note(&config, source).is_ok());
    }

    #[test]
    fn discovery_groups_by_folder() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("render").join("lists");
        std::fs::create_dir_all(&nested).unwrap();
        for file in [
            dir.path().join("top.test.md"),
            dir.path().join("notes.md"),
            dir.path().join("render").join("b.test.md"),
            dir.path().join("render").join("a.test.md"),
            nested.join("tight.test.md"),
        ] {
            std::fs::write(file, "---\n---\n").unwrap();
        }

        let categories = discover(dir.path());
        let names: Vec<&str> = categories.keys().map(String::as_str).collect();
        assert_eq!(names, ["", "render", "render/lists"]);
        assert_eq!(
            categories["render"],
            [dir.path().join("render/a.test.md"), dir.path().join("render/b.test.md")]
        );

        let listing = category_listing(&categories).unwrap();
        assert_eq!(listing, "  (root) (1 tests)\n  render (2 tests)\n  render/lists (1 tests)\n");
        assert_eq!(category_listing(&Categories::new()), None);
    }

    #[test]
    fn categories_match_by_prefix() {
        let categories: Categories = [
            ("render".to_string(), vec![PathBuf::from("r.test.md")]),
            ("render/lists".to_string(), vec![PathBuf::from("l.test.md")]),
            ("properties".to_string(), vec![PathBuf::from("p.test.md")]),
        ]
        .into_iter()
        .collect();
        let selected = select_categories(categories, &["render/".to_string()]);
        let names: Vec<&str> = selected.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["render", "render/lists"]);
    }

    #[test]
    fn paint_respects_no_color() {
        assert_eq!(paint("PASS", Style::Green, true), "PASS");
        assert_eq!(paint("FAIL", Style::Red, false), "\x1b[31mFAIL\x1b[0m");
        assert_eq!(paint("x", Style::Bold, false), "\x1b[1mx\x1b[0m");
    }

    #[test]
    fn offsets_map_to_lines() {
        assert_eq!(byte_offset_to_line("a\nb\nc", 0), 1);
        assert_eq!(byte_offset_to_line("a\nb\nc", 4), 3);
    }
}
