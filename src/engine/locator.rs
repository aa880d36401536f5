use crate::core::reference::ReferenceGenome;
use crate::core::types::DiffEvent;

/// Supplies display labels for diffs.
///
/// The engine forwards labels untouched; it never inspects their content.
/// Callers with an annotation database (e.g. amino-acid notation) implement
/// this trait and inject it into the run.
pub trait MutationLocator {
    fn locate(&self, diff: &DiffEvent) -> Option<String>;
}

impl<F> MutationLocator for F
where
    F: Fn(&DiffEvent) -> Option<String>,
{
    fn locate(&self, diff: &DiffEvent) -> Option<String> {
        self(diff)
    }
}

/// Locator that never labels anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLabels;

impl MutationLocator for NoLabels {
    fn locate(&self, _diff: &DiffEvent) -> Option<String> {
        None
    }
}

/// Nucleotide notation against the reference sequence.
///
/// Substitutions become `{ref}{pos}{alt}` (e.g. `C241T`), insertions
/// `ins:{pos}:{seq}` and deletions `del:{pos}:{length}`, all 1-indexed.
#[derive(Debug, Clone, Copy)]
pub struct NucleotideLocator<'a> {
    reference: &'a ReferenceGenome,
}

impl<'a> NucleotideLocator<'a> {
    #[must_use]
    pub fn new(reference: &'a ReferenceGenome) -> Self {
        Self { reference }
    }
}

impl MutationLocator for NucleotideLocator<'_> {
    fn locate(&self, diff: &DiffEvent) -> Option<String> {
        let pos = diff.pos() + 1;
        match diff {
            DiffEvent::Substitution { pos: at, nt } => {
                let reference = self.reference.base(*at)?;
                Some(format!("{reference}{pos}{nt}"))
            }
            DiffEvent::Insertion { seq, .. } => Some(format!("ins:{pos}:{seq}")),
            DiffEvent::Deletion { length, .. } => Some(format!("del:{pos}:{length}")),
        }
    }
}
