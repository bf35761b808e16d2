/// Reassembles newline-delimited lines from arbitrarily split byte chunks.
///
/// Bytes are buffered until a `\n` arrives, so a multi-byte UTF-8 character
/// cut in half by a chunk boundary is decoded only once it is whole.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the lines it completed, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete
            .split(|byte| *byte == b'\n')
            .filter_map(decode_line)
            .collect()
    }

    /// Drains the trailing fragment left when the stream ends without a
    /// final newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Splits a fully received body into lines, dropping blanks.
pub fn split_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    if line.trim().is_empty() {
        None
    } else {
        Some(line.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::sample::Index;

    const BODY: &str = "{\"level\":\"INFO\",\"message\":\"héllo\"}\nplain line\r\n\n{\"level\":\"ERROR\",\"message\":\"boom ✓\"}\nlast";

    fn split_at_every_boundary(body: &[u8], size: usize) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut lines = Vec::new();
        for chunk in body.chunks(size) {
            lines.extend(splitter.push(chunk));
        }
        lines.extend(splitter.finish());
        lines
    }

    #[test]
    fn chunking_does_not_change_the_lines() {
        let whole = split_at_every_boundary(BODY.as_bytes(), BODY.len());
        assert_eq!(
            whole,
            vec![
                "{\"level\":\"INFO\",\"message\":\"héllo\"}".to_string(),
                "plain line".to_string(),
                "{\"level\":\"ERROR\",\"message\":\"boom ✓\"}".to_string(),
                "last".to_string(),
            ]
        );
        for size in 1..BODY.len() {
            assert_eq!(
                split_at_every_boundary(BODY.as_bytes(), size),
                whole,
                "chunk size {size}"
            );
        }
    }

    fn feed(body: &[u8], cuts: &[usize]) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut lines = Vec::new();
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&body.len())) {
            lines.extend(splitter.push(&body[start..cut]));
            start = cut;
        }
        lines.extend(splitter.finish());
        lines
    }

    proptest! {
        #[test]
        fn arbitrary_splits_yield_the_same_lines(
            lines in prop::collection::vec((r"[^\r\n]{0,24}", any::<bool>()), 0..12),
            unterminated_tail in any::<bool>(),
            cuts in prop::collection::vec(any::<Index>(), 0..16),
        ) {
            let mut body = String::new();
            let mut last_terminator = 0;
            for (text, crlf) in &lines {
                body.push_str(text);
                let terminator = if *crlf { "\r\n" } else { "\n" };
                body.push_str(terminator);
                last_terminator = terminator.len();
            }
            if unterminated_tail {
                body.truncate(body.len() - last_terminator);
            }
            let body = body.as_bytes();

            let mut cuts: Vec<usize> = cuts.iter().map(|cut| cut.index(body.len() + 1)).collect();
            cuts.sort_unstable();

            let expected: Vec<String> = lines
                .iter()
                .map(|(text, _)| text.clone())
                .filter(|text| !text.trim().is_empty())
                .collect();
            prop_assert_eq!(feed(body, &cuts), expected);
        }
    }

    #[test]
    fn split_between_cr_and_lf_and_empty_chunks() {
        let body = b"first\r\nsecond\r\n";
        let cr = body.iter().position(|byte| *byte == b'\r').unwrap();
        let lines = feed(body, &[0, 0, cr + 1, cr + 1, body.len() - 1]);
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn keeps_trailing_fragment_until_newline() {
        let mut splitter = LineSplitter::new();
        assert!(splitter.push(b"partial").is_empty());
        assert_eq!(splitter.pending_len(), 7);
        assert_eq!(splitter.push(b" line\nnext"), vec!["partial line".to_string()]);
        assert_eq!(splitter.finish(), Some("next".to_string()));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn split_lines_drops_blank_lines() {
        assert_eq!(
            split_lines("a\n\n  \nb\r\n"),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
