use std::collections::BTreeSet;

/// Index of the first contiguous run of `lines` equal (after trimming) to the
/// `\n`-separated lines of `stored`.
pub fn find_contiguous_run(lines: &[String], stored: &str) -> Option<usize> {
    let wanted: Vec<&str> = stored.split('\n').map(str::trim).collect();
    if wanted.is_empty() || wanted.len() > lines.len() {
        return None;
    }
    lines
        .windows(wanted.len())
        .position(|w| w.iter().zip(&wanted).all(|(a, b)| a.trim() == *b))
}

/// Fetched lyric lines plus the set of selected indices.
#[derive(Debug, Clone, Default)]
pub struct LyricSheet {
    lines: Vec<String>,
    selected: BTreeSet<usize>,
    read_only: bool,
}

impl LyricSheet {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            ..Default::default()
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Select the run matching a previously saved snippet. No match leaves
    /// the selection empty.
    pub fn preselect(&mut self, stored: &str) -> bool {
        self.selected.clear();
        match find_contiguous_run(&self.lines, stored) {
            Some(start) => {
                let len = stored.split('\n').count();
                self.selected.extend(start..start + len);
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if self.read_only || index >= self.lines.len() {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn selection(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    /// Selected lines in index order, or `None` when nothing is selected.
    pub fn compose(&self) -> Option<String> {
        if self.selected.is_empty() {
            return None;
        }
        let picked: Vec<&str> = self
            .selected
            .iter()
            .map(|&i| self.lines[i].as_str())
            .collect();
        Some(picked.join("\n"))
    }
}
