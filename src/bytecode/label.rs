//! Symbolic jump targets with back-patching.
//!
//! A [`Label`] starts unplaced. Every operand slot that refers to it before
//! placement is remembered as a fix-up site; [`LabelTable::place`] fixes the
//! label at the current end of the stream and overwrites all of them. Later
//! references get the resolved value written directly.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub usize);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    pub value: Option<usize>,
    pub fixups: Vec<usize>,
}

impl Label {
    pub fn is_placed(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: Vec<Label>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh, unplaced label.
    pub fn fresh(&mut self) -> LabelId {
        self.labels.push(Label::default());
        LabelId(self.labels.len() - 1)
    }

    pub fn get(&self, id: LabelId) -> &Label {
        &self.labels[id.0]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Writes `id` into `code[site]`, or records the site when the label is
    /// not placed yet.
    pub fn reference(&mut self, id: LabelId, code: &mut [i64], site: usize) {
        let label = &mut self.labels[id.0];
        match label.value {
            Some(value) => code[site] = value as i64,
            None => label.fixups.push(site),
        }
    }

    /// Places `id` at the end of `code` and patches every recorded site.
    pub fn place(&mut self, id: LabelId, code: &mut [i64]) {
        let value = code.len();
        let label = &mut self.labels[id.0];
        label.value = Some(value);
        for &site in &label.fixups {
            code[site] = value as i64;
        }
    }

    /// Labels that were referenced but never placed.
    pub fn unplaced(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| !label.is_placed() && !label.fixups.is_empty())
            .map(|(i, _)| LabelId(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_reference_is_patched_on_place() {
        let mut labels = LabelTable::new();
        let target = labels.fresh();
        let mut code = vec![0, 0, 0, 0];

        labels.reference(target, &mut code, 1);
        labels.reference(target, &mut code, 3);
        assert_eq!(code, vec![0, 0, 0, 0]);
        assert_eq!(labels.get(target).fixups, vec![1, 3]);

        code.push(0);
        labels.place(target, &mut code);
        assert_eq!(labels.get(target).value, Some(5));
        assert_eq!(code[1], 5);
        assert_eq!(code[3], 5);
    }

    #[test]
    fn test_backward_reference_is_written_immediately() {
        let mut labels = LabelTable::new();
        let mut code = vec![0, 0];
        let top = labels.fresh();
        labels.place(top, &mut code);

        code.extend([0, 0]);
        labels.reference(top, &mut code, 3);
        assert_eq!(code[3], 2);
        assert!(labels.get(top).fixups.is_empty());
    }

    #[test]
    fn test_every_fixup_holds_the_value() {
        let mut labels = LabelTable::new();
        let a = labels.fresh();
        let b = labels.fresh();
        let mut code = vec![0; 6];
        for site in [0, 2, 4] {
            labels.reference(a, &mut code, site);
        }
        labels.reference(b, &mut code, 5);
        labels.place(a, &mut code);

        assert!(
            labels
                .get(a)
                .fixups
                .iter()
                .all(|&site| code[site] == 6)
        );
        assert_eq!(code[5], 0);
        assert_eq!(labels.unplaced().collect::<Vec<_>>(), vec![b]);
    }
}
