//! Holds the documents the user picked until they are submitted.

use shared::domain::{DocumentSlot, StagedDocument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedFiles {
    resume: Option<StagedDocument>,
    job_description: Option<StagedDocument>,
}

/// Everything `POST /analyze` needs, captured when the wizard enters Loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub resume: StagedDocument,
    pub job_description: StagedDocument,
    pub additional_info: String,
}

impl StagedFiles {
    /// Replaces whatever was staged in `slot`.
    pub fn set_file(&mut self, slot: DocumentSlot, document: StagedDocument) {
        *self.slot_mut(slot) = Some(document);
    }

    pub fn get(&self, slot: DocumentSlot) -> Option<&StagedDocument> {
        match slot {
            DocumentSlot::Resume => self.resume.as_ref(),
            DocumentSlot::JobDescription => self.job_description.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.resume.is_some() && self.job_description.is_some()
    }

    pub fn missing(&self) -> Vec<DocumentSlot> {
        DocumentSlot::ALL
            .into_iter()
            .filter(|slot| self.get(*slot).is_none())
            .collect()
    }

    pub fn reset(&mut self) {
        self.resume = None;
        self.job_description = None;
    }

    pub fn to_request(&self, additional_info: impl Into<String>) -> Option<SubmissionRequest> {
        Some(SubmissionRequest {
            resume: self.resume.clone()?,
            job_description: self.job_description.clone()?,
            additional_info: additional_info.into(),
        })
    }

    fn slot_mut(&mut self, slot: DocumentSlot) -> &mut Option<StagedDocument> {
        match slot {
            DocumentSlot::Resume => &mut self.resume,
            DocumentSlot::JobDescription => &mut self.job_description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> StagedDocument {
        StagedDocument::from_path(format!("/tmp/{name}"))
    }

    #[test]
    fn complete_only_when_both_slots_assigned() {
        let mut staged = StagedFiles::default();
        assert!(!staged.is_complete());
        assert_eq!(
            staged.missing(),
            vec![DocumentSlot::Resume, DocumentSlot::JobDescription]
        );

        staged.set_file(DocumentSlot::Resume, doc("cv.pdf"));
        assert!(!staged.is_complete());
        assert_eq!(staged.missing(), vec![DocumentSlot::JobDescription]);

        staged.set_file(DocumentSlot::JobDescription, doc("jd.pdf"));
        assert!(staged.is_complete());
        assert!(staged.missing().is_empty());
    }

    #[test]
    fn reassignment_replaces_and_keeps_completeness() {
        let mut staged = StagedFiles::default();
        staged.set_file(DocumentSlot::Resume, doc("old.pdf"));
        staged.set_file(DocumentSlot::Resume, doc("new.pdf"));
        assert!(!staged.is_complete());
        assert_eq!(
            staged.get(DocumentSlot::Resume).map(|d| d.file_name.as_str()),
            Some("new.pdf")
        );

        staged.set_file(DocumentSlot::JobDescription, doc("jd.pdf"));
        staged.set_file(DocumentSlot::JobDescription, doc("jd-v2.pdf"));
        assert!(staged.is_complete());
    }

    #[test]
    fn every_assignment_sequence_matches_both_slots_seen() {
        // Enumerate all sequences of up to four assignments.
        let slots = DocumentSlot::ALL;
        for len in 0..=4u32 {
            for mask in 0..(1u32 << len) {
                let mut staged = StagedFiles::default();
                let mut seen_resume = false;
                let mut seen_jd = false;
                for i in 0..len {
                    let slot = slots[((mask >> i) & 1) as usize];
                    staged.set_file(slot, doc(&format!("{i}.pdf")));
                    match slot {
                        DocumentSlot::Resume => seen_resume = true,
                        DocumentSlot::JobDescription => seen_jd = true,
                    }
                }
                assert_eq!(staged.is_complete(), seen_resume && seen_jd);
            }
        }
    }

    #[test]
    fn reset_empties_both_slots() {
        let mut staged = StagedFiles::default();
        staged.set_file(DocumentSlot::Resume, doc("cv.pdf"));
        staged.set_file(DocumentSlot::JobDescription, doc("jd.pdf"));
        staged.reset();
        assert_eq!(staged, StagedFiles::default());
        assert!(staged.to_request("").is_none());
    }

    #[test]
    fn request_carries_text_verbatim() {
        let mut staged = StagedFiles::default();
        staged.set_file(DocumentSlot::Resume, doc("cv.pdf"));
        staged.set_file(DocumentSlot::JobDescription, doc("jd.pdf"));

        let request = staged
            .to_request("  led a team of 4  ")
            .expect("complete staging");
        assert_eq!(request.additional_info, "  led a team of 4  ");
        assert_eq!(request.resume.file_name, "cv.pdf");
        assert_eq!(request.job_description.file_name, "jd.pdf");
    }
}
