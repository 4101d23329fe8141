/// Maps byte offsets in the compiled body back to 1-indexed lines of the
/// original file.
///
/// The body handed to the classifier may have been rewritten by task
/// synthesis, so its line `n` is not necessarily line `n` of the file.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Byte offset at which each body line starts.
    starts: Vec<usize>,
    /// Original body line index (0-based) for each body line.
    origins: Option<Vec<usize>>,
    /// File line on which the body starts.
    first_line: usize,
}

impl LineMap {
    /// A body that is an unmodified slice of the file starting at `first_line`.
    pub fn identity(text: &str, first_line: usize) -> Self {
        LineMap {
            starts: line_starts(text),
            origins: None,
            first_line,
        }
    }

    /// A rewritten body whose line `i` came from original body line `origins[i]`.
    pub fn remapped(text: &str, first_line: usize, origins: Vec<usize>) -> Self {
        LineMap {
            starts: line_starts(text),
            origins: Some(origins),
            first_line,
        }
    }

    /// 0-based index of the body line containing `offset`.
    fn body_line(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).saturating_sub(1)
    }

    /// 1-indexed file line containing the byte at `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        let index = self.body_line(offset);
        let original = match &self.origins {
            Some(origins) => origins
                .get(index)
                .or_else(|| origins.last())
                .copied()
                .unwrap_or(0),
            None => index,
        };
        self.first_line + original
    }

    /// 1-indexed byte column of `offset` within its body line.
    pub fn column_of(&self, offset: usize) -> usize {
        let index = self.body_line(offset);
        offset - self.starts.get(index).copied().unwrap_or(0) + 1
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}
