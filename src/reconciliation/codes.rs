use std::collections::BTreeSet;

/// Sequential zero-padded code generator.
///
/// Hands out the lowest free positive number at or above its cursor, so gaps
/// left in existing data are filled before the sequence grows.
#[derive(Debug, Clone)]
pub struct CodeAllocator {
    width: usize,
    taken: BTreeSet<u64>,
    cursor: u64,
}

impl CodeAllocator {
    /// Build an allocator from codes already in use. Non-numeric codes are ignored.
    pub fn new<S: AsRef<str>>(width: usize, existing: impl IntoIterator<Item = S>) -> Self {
        let taken = existing
            .into_iter()
            .filter_map(|code| parse_code(code.as_ref()))
            .collect();
        Self {
            width,
            taken,
            cursor: 1,
        }
    }

    pub fn next_code(&mut self) -> String {
        while self.taken.contains(&self.cursor) {
            self.cursor += 1;
        }
        let number = self.cursor;
        self.taken.insert(number);
        self.cursor += 1;
        self.format(number)
    }

    /// Mark a code as used
    pub fn reserve(&mut self, code: &str) {
        if let Some(number) = parse_code(code) {
            self.taken.insert(number);
        }
    }

    /// Give back a code whose entity was never stored
    pub fn release(&mut self, code: &str) {
        if let Some(number) = parse_code(code) {
            if self.taken.remove(&number) {
                self.cursor = self.cursor.min(number);
            }
        }
    }

    fn format(&self, number: u64) -> String {
        format!("{:0width$}", number, width = self.width)
    }
}

fn parse_code(code: &str) -> Option<u64> {
    code.trim().parse::<u64>().ok().filter(|n| *n > 0)
}
