//! Outline domain library for star-marked outline documents.
//! The parser is pure and total over its input; persistence and presentation
//! live in collaborator modules that consume the parser's tree.

pub mod core {
    use serde::{Deserialize, Serialize};

    /// Tag carried by the synthetic top node of every parse result.
    pub const ROOT_TAG: &str = "root";

    /* ------------------------------- Tree ------------------------------- */

    /// A heading together with the content nested beneath it.
    ///
    /// The root of a parse result is synthetic: its `tag` is [`ROOT_TAG`] and
    /// its `children` are the document's top-level sections and leading lines.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OutlineNode {
        /// The node's own heading line, verbatim (markers included), or
        /// [`ROOT_TAG`] for the synthetic root.
        pub tag: String,

        /// Nested content in document order.
        #[serde(default)]
        pub children: Vec<OutlineItem>,
    }

    /// One entry in a node's children: a bare content line or a nested branch.
    ///
    /// Serialized untagged, so a leaf is a plain JSON string and a branch is a
    /// `{"tag": .., "children": ..}` object.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum OutlineItem {
        Line(String),
        Node(OutlineNode),
    }

    impl OutlineNode {
        pub fn new(tag: impl Into<String>) -> Self {
            Self {
                tag: tag.into(),
                children: vec![],
            }
        }

        /// Fresh synthetic root with no children.
        pub fn root() -> Self {
            Self::new(ROOT_TAG)
        }

        pub fn is_root(&self) -> bool {
            self.tag == ROOT_TAG
        }

        /// Number of source lines held by this subtree: every leaf plus every
        /// branch tag. The synthetic root's own tag is not a source line and
        /// is not counted.
        pub fn line_count(&self) -> usize {
            let own = usize::from(!self.is_root());
            own + self
                .children
                .iter()
                .map(|item| match item {
                    OutlineItem::Line(_) => 1,
                    OutlineItem::Node(node) => node.line_count(),
                })
                .sum::<usize>()
        }

        /// Depth-first visit of every item below this node, in document order.
        /// The callback receives each item's depth; direct children are at 0.
        pub fn walk<'a>(&'a self, visit: &mut impl FnMut(usize, &'a OutlineItem)) {
            fn rec<'a>(
                node: &'a OutlineNode,
                depth: usize,
                visit: &mut impl FnMut(usize, &'a OutlineItem),
            ) {
                for item in &node.children {
                    visit(depth, item);
                    if let OutlineItem::Node(child) = item {
                        rec(child, depth + 1, visit);
                    }
                }
            }
            rec(self, 0, visit)
        }
    }

    impl OutlineItem {
        pub fn as_line(&self) -> Option<&str> {
            match self {
                OutlineItem::Line(line) => Some(line),
                OutlineItem::Node(_) => None,
            }
        }

        pub fn as_node(&self) -> Option<&OutlineNode> {
            match self {
                OutlineItem::Node(node) => Some(node),
                OutlineItem::Line(_) => None,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn items_serialize_in_the_field_presence_shape() {
            let node = OutlineNode {
                tag: "* A".into(),
                children: vec![
                    OutlineItem::Line("body".into()),
                    OutlineItem::Node(OutlineNode::new("** B")),
                ],
            };
            let json = serde_json::to_value(OutlineItem::Node(node)).expect("serialize");
            assert_eq!(
                json,
                serde_json::json!({
                    "tag": "* A",
                    "children": ["body", {"tag": "** B", "children": []}],
                })
            );
        }

        #[test]
        fn items_deserialize_from_bare_strings_and_objects() {
            let item: OutlineItem =
                serde_json::from_str(r#"{"tag": "* A", "children": ["x"]}"#).expect("node");
            let node = item.as_node().expect("branch");
            assert_eq!(node.tag, "* A");
            assert_eq!(node.children[0].as_line(), Some("x"));

            let item: OutlineItem = serde_json::from_str(r#""plain""#).expect("leaf");
            assert_eq!(item.as_line(), Some("plain"));
        }

        #[test]
        fn line_count_skips_only_the_root_tag() {
            let mut root = OutlineNode::root();
            root.children = vec![
                OutlineItem::Line("a".into()),
                OutlineItem::Node(OutlineNode {
                    tag: "* B".into(),
                    children: vec![OutlineItem::Line("c".into())],
                }),
            ];
            assert_eq!(root.line_count(), 3);
        }

        #[test]
        fn walk_visits_in_document_order_with_depths() {
            let mut root = OutlineNode::root();
            root.children = vec![
                OutlineItem::Node(OutlineNode {
                    tag: "* A".into(),
                    children: vec![OutlineItem::Line("a1".into())],
                }),
                OutlineItem::Line("tail".into()),
            ];

            let mut seen = Vec::new();
            root.walk(&mut |depth, item| {
                let text = match item {
                    OutlineItem::Line(line) => line.as_str(),
                    OutlineItem::Node(node) => node.tag.as_str(),
                };
                seen.push((depth, text.to_string()));
            });
            assert_eq!(
                seen,
                vec![
                    (0, "* A".to_string()),
                    (1, "a1".to_string()),
                    (0, "tail".to_string()),
                ]
            );
        }
    }
}

pub mod storage {
    //! Persistence for raw outline text under opaque keys.
    //!
    //! A notebook holds documents verbatim; it never inspects or rewrites the
    //! text it stores. Parsing is independent of storage and the application
    //! layer wires the two together.

    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use std::{
        fs, io,
        path::{Path, PathBuf},
    };

    #[derive(Debug, thiserror::Error)]
    pub enum StoreError {
        #[error("reading notebook {path:?}")]
        Read {
            path: PathBuf,
            #[source]
            source: io::Error,
        },
        #[error("writing notebook {path:?}")]
        Write {
            path: PathBuf,
            #[source]
            source: io::Error,
        },
        #[error("notebook {path:?} is not valid JSON")]
        Malformed {
            path: PathBuf,
            #[source]
            source: serde_json::Error,
        },
        #[error("encoding notebook {path:?}")]
        Encode {
            path: PathBuf,
            #[source]
            source: serde_json::Error,
        },
    }

    /// Key/value access to stored documents.
    pub trait DocumentStore {
        fn get(&self, key: &str) -> Option<&str>;
        fn put(&mut self, key: &str, text: &str);
        /// Returns whether the key was present.
        fn remove(&mut self, key: &str) -> bool;
        /// Keys in insertion order.
        fn keys(&self) -> Vec<&str>;
    }

    /* ------------------------------ Notebook ------------------------------ */

    /// In-memory notebook: opaque key to verbatim document text, insertion
    /// order preserved.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Notebook {
        #[serde(default)]
        pub entries: IndexMap<String, String>,
    }

    impl Notebook {
        pub fn is_empty(&self) -> bool {
            self.entries.is_empty()
        }

        pub fn len(&self) -> usize {
            self.entries.len()
        }
    }

    impl DocumentStore for Notebook {
        fn get(&self, key: &str) -> Option<&str> {
            self.entries.get(key).map(|s| s.as_str())
        }

        fn put(&mut self, key: &str, text: &str) {
            self.entries.insert(key.to_string(), text.to_string());
        }

        fn remove(&mut self, key: &str) -> bool {
            self.entries.shift_remove(key).is_some()
        }

        fn keys(&self) -> Vec<&str> {
            self.entries.keys().map(|k| k.as_str()).collect()
        }
    }

    /* ---------------------------- File backing ---------------------------- */

    /// Notebook persisted as pretty JSON at a fixed path. Open, mutate in
    /// memory, save.
    #[derive(Debug)]
    pub struct JsonFileStore {
        path: PathBuf,
        pub notebook: Notebook,
    }

    impl JsonFileStore {
        /// Open the notebook at `path`. A missing file yields an empty
        /// notebook; anything unreadable or non-JSON is an error.
        pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
            let path = path.into();
            let notebook = match fs::read_to_string(&path) {
                Ok(text) => {
                    serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
                        path: path.clone(),
                        source,
                    })?
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => Notebook::default(),
                Err(source) => return Err(StoreError::Read { path, source }),
            };
            Ok(Self { path, notebook })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub fn save(&self) -> Result<(), StoreError> {
            let json = serde_json::to_string_pretty(&self.notebook).map_err(|source| {
                StoreError::Encode {
                    path: self.path.clone(),
                    source,
                }
            })?;
            fs::write(&self.path, json).map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
        }
    }

    impl DocumentStore for JsonFileStore {
        fn get(&self, key: &str) -> Option<&str> {
            self.notebook.get(key)
        }

        fn put(&mut self, key: &str, text: &str) {
            self.notebook.put(key, text);
        }

        fn remove(&mut self, key: &str) -> bool {
            self.notebook.remove(key)
        }

        fn keys(&self) -> Vec<&str> {
            self.notebook.keys()
        }
    }

}

pub mod parser {
    //! Line-oriented outline parser.
    //!
    //! The scan is total: any input string yields a well-formed tree. A
    //! heading line opens a branch; the branch buffers every line beneath it
    //! verbatim, and the buffer is re-partitioned recursively when the branch
    //! closes. A deeper heading therefore becomes the next frame's baseline no
    //! matter how many marker levels it skips, and no global depth is ever
    //! computed.

    use crate::core::{OutlineItem, OutlineNode};

    /* ------------------------ Public entry point ------------------------ */

    /// Parse an outline document into its tree.
    ///
    /// Never fails. Input with no headings degrades to a flat list of leaves
    /// under the synthetic root, and every input line appears in the tree
    /// exactly once. The empty string still splits into one empty line, which
    /// is kept as a leaf so line counts survive the round trip.
    pub fn parse_outline(text: &str) -> OutlineNode {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut root = OutlineNode::root();
        root.children = partition(&lines);
        root
    }

    /// Heading level of a line: the count of contiguous leading `*` markers.
    /// Zero means plain content. No separator after the markers is required.
    pub fn heading_level(line: &str) -> usize {
        line.chars().take_while(|c| *c == '*').count()
    }

    /* ----------------------------- Partition ----------------------------- */

    /// A heading whose body is still being accumulated.
    struct OpenBranch<'a> {
        tag: &'a str,
        body: Vec<&'a str>,
    }

    impl<'a> OpenBranch<'a> {
        fn new(tag: &'a str) -> Self {
            Self { tag, body: vec![] }
        }

        /// Close the branch: the buffered body becomes its children through a
        /// fresh partition frame.
        fn finish(self) -> OutlineItem {
            OutlineItem::Node(OutlineNode {
                tag: self.tag.to_string(),
                children: partition(&self.body),
            })
        }
    }

    /// One partition frame over a bounded run of lines.
    ///
    /// A heading at or above the frame's baseline starts a sibling (equal
    /// level never nests); a deeper heading is deferred into the open branch's
    /// buffer and resolved by the recursive call that closes the branch.
    fn partition(lines: &[&str]) -> Vec<OutlineItem> {
        let mut items = Vec::new();
        let mut open: Option<OpenBranch<'_>> = None;
        let mut baseline = 0;

        for &line in lines {
            let level = heading_level(line);

            if level == 0 {
                match open.as_mut() {
                    Some(branch) => branch.body.push(line),
                    None => items.push(OutlineItem::Line(line.to_string())),
                }
                continue;
            }

            match open.as_mut() {
                Some(branch) if level > baseline => branch.body.push(line),
                _ => {
                    if let Some(branch) = open.take() {
                        items.push(branch.finish());
                    }
                    baseline = level;
                    open = Some(OpenBranch::new(line));
                }
            }
        }

        // The trailing branch closes like any other.
        if let Some(branch) = open.take() {
            items.push(branch.finish());
        }

        items
    }

}

pub mod format {
    //! Diagnostic rendering of outline trees.

    use crate::core::{OutlineItem, OutlineNode};

    /// Render the tree as indented text, one node or line per row, in
    /// document order. Empty leaves are skipped for display; the tree itself
    /// keeps them.
    pub fn dump_tree(root: &OutlineNode) -> String {
        let mut out = String::new();
        dump_node(&mut out, root, 0);
        out
    }

    fn dump_node(out: &mut String, node: &OutlineNode, depth: usize) {
        push_row(out, depth, &node.tag);
        for child in &node.children {
            match child {
                OutlineItem::Line(line) => {
                    if !line.is_empty() {
                        push_row(out, depth + 1, line);
                    }
                }
                OutlineItem::Node(nested) => dump_node(out, nested, depth + 1),
            }
        }
    }

    fn push_row(out: &mut String, depth: usize, text: &str) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(text);
        out.push('\n');
    }

    #[cfg(test)]
    mod tests {
        use super::dump_tree;
        use crate::parser::parse_outline;

        #[test]
        fn dump_indents_by_recursion_depth() {
            let tree = parse_outline("* A\nline1\n\n*** B\nline2\n* C");
            let expected = "\
root
  * A
    line1
    *** B
      line2
  * C
";
            assert_eq!(dump_tree(&tree), expected);
        }

        #[test]
        fn dump_of_flat_text_lists_every_nonempty_line() {
            let tree = parse_outline("one\n\ntwo");
            assert_eq!(dump_tree(&tree), "root\n  one\n  two\n");
        }
    }
}

pub mod projectors {
    pub mod display_projector {
        //! Read-model projection for renderers: flattens an outline tree into
        //! presentation rows, classifying heading keywords and extracting
        //! planning annotations from content lines. Tags and lines pass
        //! through verbatim; anything unrecognized degrades to a plain row.

        use crate::core::{OutlineItem, OutlineNode};
        use chrono::NaiveDate;
        use nom::{
            IResult,
            branch::alt,
            bytes::complete::{tag, take_while_m_n},
            character::complete::{char, one_of, space0, space1},
            combinator::{eof, map_res, opt, recognize, value},
            multi::many1,
            sequence::{delimited, terminated, tuple},
        };
        use serde::{Deserialize, Serialize};

        /* -------------------------------- Rows -------------------------------- */

        /// State keyword on a heading row.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct Keyword {
            pub text: String,
            pub is_done: bool,
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum NoteKind {
            Deadline,
            Scheduled,
        }

        /// A `DEADLINE:`/`SCHEDULED:` annotation with its date stamp.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub struct DateNote {
            pub kind: NoteKind,
            pub date: NaiveDate,
        }

        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum RowKind {
            Heading {
                level: usize,
                keyword: Option<Keyword>,
            },
            Text,
        }

        /// One presentation row. `text` is the source tag or line, verbatim.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct DisplayRow {
            pub depth: usize,
            pub kind: RowKind,
            pub text: String,
            pub note: Option<DateNote>,
        }

        /* ----------------------------- Projection ----------------------------- */

        /// Flatten the tree into rows in document order. The synthetic root
        /// emits no row of its own.
        pub fn project_tree(root: &OutlineNode) -> Vec<DisplayRow> {
            let mut rows = Vec::new();
            root.walk(&mut |depth, item| match item {
                OutlineItem::Node(node) => rows.push(heading_row(depth, node)),
                OutlineItem::Line(line) => rows.push(text_row(depth, line)),
            });
            rows
        }

        fn heading_row(depth: usize, node: &OutlineNode) -> DisplayRow {
            let (level, keyword) = classify_heading(&node.tag);
            DisplayRow {
                depth,
                kind: RowKind::Heading { level, keyword },
                text: node.tag.clone(),
                note: None,
            }
        }

        fn text_row(depth: usize, line: &str) -> DisplayRow {
            DisplayRow {
                depth,
                kind: RowKind::Text,
                text: line.to_string(),
                note: planning_note(line),
            }
        }

        /// Signed day distance from `today` to a date.
        pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
            (date - today).num_days()
        }

        /* --------------------------- Token matching --------------------------- */

        type PResult<'a, T> = IResult<&'a str, T>;

        /// Heading level plus the TODO/DONE keyword when one immediately
        /// follows the markers. Lines that do not fit the headline shape fall
        /// back to their raw marker count with no keyword.
        pub fn classify_heading(tag_line: &str) -> (usize, Option<Keyword>) {
            match heading_tokens(tag_line) {
                Ok((_, classified)) => classified,
                Err(_) => (crate::parser::heading_level(tag_line), None),
            }
        }

        fn heading_tokens(i: &str) -> PResult<'_, (usize, Option<Keyword>)> {
            let (i, stars) = recognize(many1(char('*')))(i)?;
            let (i, _) = space1(i)?;
            let (i, keyword) = opt(keyword_token)(i)?;
            Ok((i, (stars.len(), keyword)))
        }

        fn keyword_token(i: &str) -> PResult<'_, Keyword> {
            let (i, word) = terminated(alt((tag("TODO"), tag("DONE"))), alt((space1, eof)))(i)?;
            Ok((
                i,
                Keyword {
                    text: word.to_string(),
                    is_done: word == "DONE",
                },
            ))
        }

        /// First parseable planning annotation embedded in a content line.
        pub fn planning_note(line: &str) -> Option<DateNote> {
            let mut starts: Vec<usize> = ["DEADLINE", "SCHEDULED"]
                .iter()
                .filter_map(|marker| line.find(marker))
                .collect();
            starts.sort_unstable();
            starts
                .into_iter()
                .find_map(|at| note_token(&line[at..]).ok().map(|(_, note)| note))
        }

        fn note_token(i: &str) -> PResult<'_, DateNote> {
            let (i, kind) = alt((
                value(NoteKind::Deadline, tag("DEADLINE")),
                value(NoteKind::Scheduled, tag("SCHEDULED")),
            ))(i)?;
            let (i, _) = char(':')(i)?;
            let (i, _) = space0(i)?;
            let (i, date) = stamp(i)?;
            Ok((i, DateNote { kind, date }))
        }

        fn stamp(i: &str) -> PResult<'_, NaiveDate> {
            delimited(one_of("<["), parse_date, one_of(">]"))(i)
        }

        fn parse_date(i: &str) -> PResult<'_, NaiveDate> {
            map_res(
                tuple((
                    map_res(take_while_m_n(4, 4, char_is_digit), |s: &str| {
                        s.parse::<i32>()
                    }),
                    char('-'),
                    map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                        s.parse::<u32>()
                    }),
                    char('-'),
                    map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                        s.parse::<u32>()
                    }),
                )),
                |(y, _, m, _, d)| NaiveDate::from_ymd_opt(y, m, d).ok_or("invalid date"),
            )(i)
        }

        fn char_is_digit(c: char) -> bool {
            c.is_ascii_digit()
        }

        #[cfg(test)]
        mod tests {
            use super::*;
            use crate::parser::parse_outline;

            #[test]
            fn keywords_follow_the_markers() {
                let (level, keyword) = classify_heading("* TODO Buy milk");
                assert_eq!(level, 1);
                let keyword = keyword.expect("keyword");
                assert_eq!(keyword.text, "TODO");
                assert!(!keyword.is_done);

                let (level, keyword) = classify_heading("** DONE Ship release");
                assert_eq!(level, 2);
                assert!(keyword.expect("keyword").is_done);
            }

            #[test]
            fn near_keywords_are_plain_titles() {
                assert_eq!(classify_heading("* TODOS for the week").1, None);
                assert_eq!(classify_heading("* Done deal").1, None);
                // A bare keyword with nothing after it still counts.
                assert!(classify_heading("* TODO").1.is_some());
            }

            #[test]
            fn malformed_headlines_fall_back_to_marker_count() {
                assert_eq!(classify_heading("***"), (3, None));
                assert_eq!(classify_heading("*no space"), (1, None));
            }

            #[test]
            fn planning_notes_parse_both_stamp_styles() {
                let note = planning_note("DEADLINE: <2026-08-07>").expect("note");
                assert_eq!(note.kind, NoteKind::Deadline);
                assert_eq!(note.date, NaiveDate::from_ymd_opt(2026, 8, 7).expect("date"));

                let note = planning_note("  SCHEDULED: [2026-01-02]").expect("note");
                assert_eq!(note.kind, NoteKind::Scheduled);
            }

            #[test]
            fn planning_notes_may_be_embedded_mid_line() {
                let note = planning_note("ship it DEADLINE: <2026-12-24> hard stop");
                assert_eq!(note.expect("note").kind, NoteKind::Deadline);
            }

            #[test]
            fn malformed_annotations_degrade_to_plain_text() {
                assert_eq!(planning_note("DEADLINE soon"), None);
                assert_eq!(planning_note("DEADLINE: <2026-8-7>"), None);
                assert_eq!(planning_note("deadline: <2026-08-07>"), None);
            }

            #[test]
            fn projection_preserves_document_order_and_depth() {
                let tree = parse_outline("* TODO A\nDEADLINE: <2026-08-07>\n*** B\nplain\n* C");
                let rows = project_tree(&tree);

                let flat: Vec<(usize, &str)> = rows
                    .iter()
                    .map(|row| (row.depth, row.text.as_str()))
                    .collect();
                assert_eq!(
                    flat,
                    vec![
                        (0, "* TODO A"),
                        (1, "DEADLINE: <2026-08-07>"),
                        (1, "*** B"),
                        (2, "plain"),
                        (0, "* C"),
                    ]
                );

                assert!(matches!(
                    &rows[0].kind,
                    RowKind::Heading {
                        level: 1,
                        keyword: Some(k),
                    } if k.text == "TODO"
                ));
                assert!(rows[1].note.is_some());
                assert_eq!(rows[3].note, None);
            }

            #[test]
            fn day_arithmetic_is_signed() {
                let today = NaiveDate::from_ymd_opt(2026, 8, 4).expect("date");
                let soon = NaiveDate::from_ymd_opt(2026, 8, 7).expect("date");
                let past = NaiveDate::from_ymd_opt(2026, 8, 1).expect("date");
                assert_eq!(days_until(soon, today), 3);
                assert_eq!(days_until(past, today), -3);
                assert_eq!(days_until(today, today), 0);
            }
        }
    }
}

pub use format::dump_tree;
pub use parser::parse_outline;
