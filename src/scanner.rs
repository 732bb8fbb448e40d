//! Lexical scanner: walks source text and extracts comment blocks.
//!
//! The scanner is a sequential state machine over a rune buffer. At any
//! position exactly one state is active: normal code, a line-comment
//! run, a block comment, or a string/raw literal. Delimiters from the
//! language profile are tried in declaration order and the first match
//! wins. Text inside strings and raw literals is consumed silently so
//! comment-like content in literal data can never open or close a
//! comment.

use crate::language::{Delimiter, Escape, LanguageProfile};

/// A line/column pair, 1-based. `column` counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Whether a block came from merged line comments or a block comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    LineRun,
    Block,
}

/// A maximal contiguous run of comment text with its source position.
///
/// `lines` hold the interior text: delimiters are consumed, decorative
/// markers (`*` gutters, extra indent) are left for the annotation
/// parser to strip. `end` is exclusive: the position right after the
/// last consumed character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    pub lines: Vec<String>,
    pub start: Position,
    pub end: Position,
    pub kind: BlockKind,
    pub unterminated: bool,
}

impl CommentBlock {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Scan source text with a language profile.
///
/// The returned iterator is a pure function of its input: scanning the
/// same text twice yields an identical block sequence, in file order,
/// never overlapping.
pub fn scan<'a>(source: &str, profile: &'a LanguageProfile) -> Scanner<'a> {
    Scanner {
        chars: source.chars().collect(),
        delimiters: &profile.delimiters,
        pos: 0,
        line: 1,
        column: 1,
        last_code_char: None,
        unterminated_literal: None,
    }
}

pub struct Scanner<'a> {
    chars: Vec<char>,
    delimiters: &'a [Delimiter],
    pos: usize,
    line: usize,
    column: usize,
    last_code_char: Option<char>,
    unterminated_literal: Option<Position>,
}

#[derive(Clone, Copy)]
struct Checkpoint {
    pos: usize,
    line: usize,
    column: usize,
}

impl Iterator for Scanner<'_> {
    type Item = CommentBlock;

    fn next(&mut self) -> Option<CommentBlock> {
        while !self.at_eof() {
            if let Some(block) = self.step() {
                return Some(block);
            }
        }
        None
    }
}

impl Scanner<'_> {
    /// Position of a string or raw literal still open at end of file,
    /// if any. Available once the iterator is exhausted.
    pub fn unterminated_literal(&self) -> Option<Position> {
        self.unterminated_literal
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn current_pos(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.line = cp.line;
        self.column = cp.column;
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek_is(&self, token: &str) -> bool {
        let mut i = self.pos;
        for t in token.chars() {
            if i >= self.chars.len() || self.chars[i] != t {
                return false;
            }
            i += 1;
        }
        true
    }

    fn try_consume(&mut self, token: &str) -> bool {
        if !self.peek_is(token) {
            return false;
        }
        for _ in token.chars() {
            self.advance();
        }
        true
    }

    fn skip_horizontal_space(&mut self) {
        while !self.at_eof() {
            let c = self.peek();
            if !c.is_whitespace() || c == '\n' {
                return;
            }
            self.advance();
        }
    }

    /// Try every delimiter at the current position; on no match,
    /// consume one character of ordinary code.
    fn step(&mut self) -> Option<CommentBlock> {
        for i in 0..self.delimiters.len() {
            let delimiter = self.delimiters[i];
            match delimiter {
                Delimiter::Line { start } => {
                    if self.peek_is(start) {
                        let begin = self.current_pos();
                        self.try_consume(start);
                        return Some(self.read_line_run(start, begin));
                    }
                }
                Delimiter::Block { start, end, nested } => {
                    if self.peek_is(start) {
                        let begin = self.current_pos();
                        self.try_consume(start);
                        return Some(self.read_block(start, end, nested, begin));
                    }
                }
                Delimiter::Str { start, end, escape } => {
                    if self.peek_is(start) {
                        let begin = self.current_pos();
                        self.try_consume(start);
                        self.read_literal(end, escape, begin);
                        self.last_code_char = end.chars().last();
                        return None;
                    }
                }
                Delimiter::Raw {
                    start,
                    end,
                    escape,
                    regex,
                } => {
                    if self.peek_is(start) && (!regex || self.regex_plausible()) {
                        let begin = self.current_pos();
                        self.try_consume(start);
                        self.read_literal(end, escape, begin);
                        self.last_code_char = end.chars().last();
                        return None;
                    }
                }
                Delimiter::Heredoc { start } => {
                    if self.peek_is(start) && self.read_heredoc(start) {
                        return None;
                    }
                }
            }
        }

        let c = self.advance();
        if !c.is_whitespace() {
            self.last_code_char = Some(c);
        }
        None
    }

    /// A `/` opens a regex literal only where a value cannot end:
    /// after an identifier, a closing bracket or a literal it reads as
    /// division instead. Without real parsing this stays a heuristic.
    fn regex_plausible(&self) -> bool {
        match self.last_code_char {
            None => true,
            Some(c) => {
                !(c.is_alphanumeric() || matches!(c, '_' | ')' | ']' | '}' | '"' | '\'' | '`'))
            }
        }
    }

    /// Collect consecutive line comments that use the same start token
    /// into a single block. A run continues when the next line holds
    /// only horizontal whitespace before the token; anything else,
    /// including a blank line, ends it.
    fn read_line_run(&mut self, start: &str, begin: Position) -> CommentBlock {
        let mut lines = Vec::new();
        let mut end;

        loop {
            let mut line = String::new();
            while !self.at_eof() && self.peek() != '\n' {
                line.push(self.advance());
            }
            end = self.current_pos();
            lines.push(line);

            if self.at_eof() {
                break;
            }
            let cp = self.checkpoint();
            self.advance(); // the newline
            self.skip_horizontal_space();
            if !self.try_consume(start) {
                self.restore(cp);
                break;
            }
        }

        CommentBlock {
            lines,
            start: begin,
            end,
            kind: BlockKind::LineRun,
            unterminated: false,
        }
    }

    /// Read a block comment body. Nestable delimiters track depth;
    /// non-nestable ones close at the first end token, whatever opens
    /// may appear inside. Hitting end of file emits the collected text
    /// flagged as unterminated.
    fn read_block(
        &mut self,
        start: &str,
        end: &str,
        nested: bool,
        begin: Position,
    ) -> CommentBlock {
        let mut depth = 1usize;
        let mut lines = Vec::new();
        let mut line = String::new();

        loop {
            if self.at_eof() {
                lines.push(line);
                return CommentBlock {
                    lines,
                    start: begin,
                    end: self.current_pos(),
                    kind: BlockKind::Block,
                    unterminated: true,
                };
            }
            if self.try_consume(end) {
                depth -= 1;
                if depth == 0 {
                    lines.push(line);
                    return CommentBlock {
                        lines,
                        start: begin,
                        end: self.current_pos(),
                        kind: BlockKind::Block,
                        unterminated: false,
                    };
                }
                line.push_str(end);
                continue;
            }
            if nested && self.try_consume(start) {
                depth += 1;
                line.push_str(start);
                continue;
            }
            let c = self.advance();
            if c == '\n' {
                lines.push(std::mem::take(&mut line));
            } else {
                line.push(c);
            }
        }
    }

    /// Consume a string or raw literal without emitting anything.
    fn read_literal(&mut self, end: &str, escape: Escape, begin: Position) {
        loop {
            if self.at_eof() {
                self.unterminated_literal.get_or_insert(begin);
                return;
            }
            if let Escape::Char(esc) = escape {
                if self.peek() == esc {
                    self.advance();
                    if !self.at_eof() {
                        self.advance();
                    }
                    continue;
                }
            }
            if self.try_consume(end) {
                if escape == Escape::Doubled && self.try_consume(end) {
                    continue;
                }
                return;
            }
            self.advance();
        }
    }

    /// Consume a heredoc/nowdoc. Returns false when the marker is not
    /// followed by a token on the same line, so the caller can fall
    /// through to other delimiters.
    fn read_heredoc(&mut self, start: &str) -> bool {
        let cp = self.checkpoint();
        let begin = self.current_pos();
        self.try_consume(start);

        let mut token = String::new();
        while !self.at_eof() && self.peek() != '\n' {
            token.push(self.advance());
        }
        let token = token.trim().trim_matches('\'').trim_matches('"');
        if token.is_empty() {
            self.restore(cp);
            return false;
        }

        // The terminator must sit alone at the start of a line.
        let end_plain = format!("\n{}\n", token);
        let end_semi = format!("\n{};\n", token);
        loop {
            if self.at_eof() {
                self.unterminated_literal.get_or_insert(begin);
                return true;
            }
            if self.try_consume(&end_plain) || self.try_consume(&end_semi) {
                return true;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn scan_all(source: &str, lang: Language) -> Vec<CommentBlock> {
        scan(source, &lang.profile()).collect()
    }

    #[test]
    fn test_line_comments_merge_into_one_block() {
        let source = "// first\n// second\n// third\nfunc main() {}\n";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::LineRun);
        assert_eq!(blocks[0].lines, vec![" first", " second", " third"]);
        assert_eq!(blocks[0].start, Position { line: 1, column: 1 });
        assert_eq!(blocks[0].end.line, 3);
    }

    #[test]
    fn test_blank_line_splits_line_runs() {
        let source = "// one\n\n// two\n";
        let blocks = scan_all(source, Language::Go);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_code_between_comments_splits_runs() {
        let source = "// one\nx := 1 // two\n// three\n";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines, vec![" one"]);
        // the trailing comment merges with the next line's comment
        assert_eq!(blocks[1].lines, vec![" two", " three"]);
    }

    #[test]
    fn test_indented_line_comments_merge() {
        let source = "  // a\n    // b\n";
        let blocks = scan_all(source, Language::Go);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" a", " b"]);
        assert_eq!(blocks[0].start, Position { line: 1, column: 3 });
    }

    #[test]
    fn test_block_comment_positions() {
        let source = "x\n/* hello\n   world */ y\n";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Block);
        assert_eq!(blocks[0].lines, vec![" hello", "   world "]);
        assert_eq!(blocks[0].start, Position { line: 2, column: 1 });
        assert_eq!(blocks[0].end, Position { line: 3, column: 12 });
    }

    #[test]
    fn test_comment_delimiter_inside_string_ignored() {
        let source = "s := \"/* not a comment */\"\n// real\n";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" real"]);
    }

    #[test]
    fn test_template_literal_spanning_lines_hides_comment_text() {
        // The `****/` inside the template literal must not terminate
        // anything: the whole backtick literal is one raw run.
        let source = "const s = `line1\n****/\n// still a literal\n`;\n// after\n";
        let blocks = scan_all(source, Language::JavaScript);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" after"]);
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let source = "s := \"a\\\" // b\"\n// real\n";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" real"]);
    }

    #[test]
    fn test_non_nestable_block_closes_at_first_end() {
        let source = "/*/* TODO */*/\n";
        let blocks = scan_all(source, Language::C);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "/* TODO ");
        assert!(!blocks[0].unterminated);
        // the dangling */ stays behind as ordinary code
        assert_eq!(blocks[0].end, Position { line: 1, column: 13 });
    }

    #[test]
    fn test_nestable_block_tracks_depth() {
        let source = "/* outer /* inner */ still outer */ code\n// tail\n";
        let blocks = scan_all(source, Language::Swift);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), " outer /* inner */ still outer ");
        assert_eq!(blocks[1].lines, vec![" tail"]);
    }

    #[test]
    fn test_unterminated_block_emitted_with_flag() {
        let source = "code\n/* never closed\nmore text";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].unterminated);
        assert_eq!(blocks[0].lines, vec![" never closed", "more text"]);
    }

    #[test]
    fn test_unterminated_string_recorded() {
        let source = "s := \"open\nnext line";
        let profile = Language::Go.profile();
        let mut scanner = scan(source, &profile);
        assert!(scanner.next().is_none());
        assert_eq!(
            scanner.unterminated_literal(),
            Some(Position { line: 1, column: 6 })
        );
    }

    #[test]
    fn test_regex_literal_hides_comment_delimiters() {
        let source = "const re = /a\\/b \\/* c/; // real\n";
        let blocks = scan_all(source, Language::JavaScript);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" real"]);
    }

    #[test]
    fn test_slash_after_identifier_is_division() {
        // `a / b` then a line comment: the `/` must not open a regex
        // that would swallow the rest of the file.
        let source = "x = a / b\n// real\n";
        let blocks = scan_all(source, Language::JavaScript);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" real"]);
    }

    #[test]
    fn test_php_heredoc_hides_comment_text() {
        let source = "$s = <<<EOT\n// not a comment\n/* neither */\nEOT;\n# real\n";
        let blocks = scan_all(source, Language::Php);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].lines, vec![" real"]);
    }

    #[test]
    fn test_pascal_doubled_quote_stays_in_string() {
        let source = "s := 'it''s { not a comment }';\n{ real }\n";
        let blocks = scan_all(source, Language::Pascal);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), " real ");
    }

    #[test]
    fn test_python_docstring_scans_as_block() {
        let source = "def f():\n    \"\"\"doc text\n    more\"\"\"\n    x = \"# no\"\n# real\n";
        let blocks = scan_all(source, Language::Python);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::Block);
        assert_eq!(blocks[1].lines, vec![" real"]);
    }

    #[test]
    fn test_blocks_ordered_and_non_overlapping() {
        let source = "// a\nx\n/* b */\ny\n// c\n";
        let blocks = scan_all(source, Language::Go);

        assert_eq!(blocks.len(), 3);
        for pair in blocks.windows(2) {
            let prev_end = (pair[0].end.line, pair[0].end.column);
            let next_start = (pair[1].start.line, pair[1].start.column);
            assert!(prev_end <= next_start);
        }
    }

    #[test]
    fn test_scan_is_deterministic() {
        let source = "// a\ns := \"/*\"\n/* b\n*/\nconst r = `//`\n";
        let profile = Language::Go.profile();
        let first: Vec<_> = scan(source, &profile).collect();
        let second: Vec<_> = scan(source, &profile).collect();
        assert_eq!(first, second);
    }
}
