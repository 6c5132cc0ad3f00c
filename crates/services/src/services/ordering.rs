//! Drag-and-drop resolution and question renumbering for the survey editor.

use db::models::{
    question::Question,
    section::{Section, SectionWithQuestions, SurveyPhase},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::Display;
use thiserror::Error;
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a drag event left the layout untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IgnoreReason {
    /// The drop happened outside any droppable target.
    MissingTarget,
    /// Dropped onto itself.
    SelfTarget,
    /// The dragged id matches neither a section nor a question.
    UnknownActive,
    /// The drop target matches neither a section nor a question.
    UnknownTarget,
    /// Fixed questions cannot leave their section.
    FixedQuestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ReorderOutcome {
    Moved,
    Ignored(IgnoreReason),
}

/// One section of the phase being reordered, reduced to what the resolver
/// needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLayout {
    pub section_id: Uuid,
    pub questions: Vec<QuestionSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSlot {
    pub question_id: Uuid,
    pub is_fixed: bool,
    pub question_number: String,
}

/// Resolve a drag-end event against one phase's section list.
///
/// Section onto section moves the dragged section to the target's index.
/// Question onto section appends the question at the end of that section.
/// Question onto question inserts at the target question's index in its
/// owning section. Every successful move ends with a full renumber pass.
pub fn apply_drag(
    sections: &mut Vec<SectionLayout>,
    active_id: Uuid,
    over_id: Option<Uuid>,
) -> ReorderOutcome {
    let Some(over_id) = over_id else {
        return ReorderOutcome::Ignored(IgnoreReason::MissingTarget);
    };
    if active_id == over_id {
        return ReorderOutcome::Ignored(IgnoreReason::SelfTarget);
    }

    if let Some(from) = sections.iter().position(|s| s.section_id == active_id) {
        let Some(to) = sections.iter().position(|s| s.section_id == over_id) else {
            return ReorderOutcome::Ignored(IgnoreReason::UnknownTarget);
        };
        let moved = sections.remove(from);
        sections.insert(to, moved);
        renumber(sections);
        return ReorderOutcome::Moved;
    }

    let Some((src_section, src_index)) = locate_question(sections, active_id) else {
        return ReorderOutcome::Ignored(IgnoreReason::UnknownActive);
    };

    if let Some(dst_section) = sections.iter().position(|s| s.section_id == over_id) {
        if dst_section != src_section && sections[src_section].questions[src_index].is_fixed {
            return ReorderOutcome::Ignored(IgnoreReason::FixedQuestion);
        }
        let slot = sections[src_section].questions.remove(src_index);
        sections[dst_section].questions.push(slot);
        renumber(sections);
        return ReorderOutcome::Moved;
    }

    if let Some((dst_section, dst_index)) = locate_question(sections, over_id) {
        if dst_section != src_section && sections[src_section].questions[src_index].is_fixed {
            return ReorderOutcome::Ignored(IgnoreReason::FixedQuestion);
        }
        // dst_index is the index observed at drop time; removing first from
        // the same section reproduces the array-move placement.
        let slot = sections[src_section].questions.remove(src_index);
        sections[dst_section].questions.insert(dst_index, slot);
        renumber(sections);
        return ReorderOutcome::Moved;
    }

    ReorderOutcome::Ignored(IgnoreReason::UnknownTarget)
}

/// Restore the numbering invariant: a single left-to-right, section-major
/// pass assigning "Q1".."Qn".
pub fn renumber(sections: &mut [SectionLayout]) {
    let mut counter = 0usize;
    for section in sections.iter_mut() {
        for slot in section.questions.iter_mut() {
            counter += 1;
            slot.question_number = format!("Q{counter}");
        }
    }
}

fn locate_question(sections: &[SectionLayout], question_id: Uuid) -> Option<(usize, usize)> {
    sections.iter().enumerate().find_map(|(section_index, section)| {
        section
            .questions
            .iter()
            .position(|slot| slot.question_id == question_id)
            .map(|question_index| (section_index, question_index))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReorderRequest {
    pub active_id: Uuid,
    pub over_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ReorderResult {
    pub outcome: ReorderOutcome,
    pub sections: Vec<SectionWithQuestions>,
}

/// Applies drag events to a stored survey and keeps numbering consistent
/// across creates and deletes.
#[derive(Clone)]
pub struct SurveyOrderingService {
    pool: SqlitePool,
}

impl SurveyOrderingService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the phase layout, resolve the drag, persist the new arrangement.
    /// Ignored events are logged and return the unchanged layout.
    pub async fn reorder(
        &self,
        survey_id: Uuid,
        phase: &SurveyPhase,
        request: &ReorderRequest,
    ) -> Result<ReorderResult, OrderingError> {
        let mut layout = self.load_layout(survey_id, phase).await?;
        let outcome = apply_drag(&mut layout, request.active_id, request.over_id);

        match &outcome {
            ReorderOutcome::Moved => self.persist_layout(&layout).await?,
            ReorderOutcome::Ignored(reason) => {
                warn!(
                    survey_id = %survey_id,
                    active_id = %request.active_id,
                    over_id = ?request.over_id,
                    reason = %reason,
                    "drag event ignored"
                );
            }
        }

        let sections = SectionWithQuestions::load_phase(&self.pool, survey_id, phase).await?;
        Ok(ReorderResult { outcome, sections })
    }

    /// Recompute numbering for a phase after a question create or delete.
    pub async fn renumber_phase(
        &self,
        survey_id: Uuid,
        phase: &SurveyPhase,
    ) -> Result<(), OrderingError> {
        let mut layout = self.load_layout(survey_id, phase).await?;
        renumber(&mut layout);
        self.persist_layout(&layout).await
    }

    async fn load_layout(
        &self,
        survey_id: Uuid,
        phase: &SurveyPhase,
    ) -> Result<Vec<SectionLayout>, OrderingError> {
        let sections = Section::find_by_survey_and_phase(&self.pool, survey_id, phase).await?;
        let mut layout = Vec::with_capacity(sections.len());
        for section in sections {
            let questions = Question::find_by_section(&self.pool, section.id)
                .await?
                .into_iter()
                .map(|question| QuestionSlot {
                    question_id: question.id,
                    is_fixed: question.is_fixed,
                    question_number: question.question_number,
                })
                .collect();
            layout.push(SectionLayout {
                section_id: section.id,
                questions,
            });
        }
        Ok(layout)
    }

    async fn persist_layout(&self, layout: &[SectionLayout]) -> Result<(), OrderingError> {
        let mut tx = self.pool.begin().await?;
        for (section_position, section) in layout.iter().enumerate() {
            Section::update_position(&mut *tx, section.section_id, section_position as i64).await?;
            for (question_position, slot) in section.questions.iter().enumerate() {
                Question::update_placement(
                    &mut *tx,
                    slot.question_id,
                    section.section_id,
                    question_position as i64,
                    &slot.question_number,
                )
                .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: Uuid) -> QuestionSlot {
        QuestionSlot {
            question_id: id,
            is_fixed: false,
            question_number: String::new(),
        }
    }

    fn numbered(sections: &[SectionLayout]) -> Vec<String> {
        sections
            .iter()
            .flat_map(|s| s.questions.iter().map(|q| q.question_number.clone()))
            .collect()
    }

    fn two_sections() -> (Vec<SectionLayout>, Uuid, Uuid, Uuid, Uuid, Uuid) {
        let section_a = Uuid::new_v4();
        let section_b = Uuid::new_v4();
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let q3 = Uuid::new_v4();
        let mut sections = vec![
            SectionLayout {
                section_id: section_a,
                questions: vec![slot(q1), slot(q2)],
            },
            SectionLayout {
                section_id: section_b,
                questions: vec![slot(q3)],
            },
        ];
        renumber(&mut sections);
        (sections, section_a, section_b, q1, q2, q3)
    }

    #[test]
    fn question_onto_section_appends_at_end() {
        let (mut sections, _, section_b, _, q2, q3) = two_sections();

        let outcome = apply_drag(&mut sections, q2, Some(section_b));

        assert_eq!(outcome, ReorderOutcome::Moved);
        assert_eq!(sections[0].questions.len(), 1);
        assert_eq!(sections[1].questions.len(), 2);
        assert_eq!(sections[1].questions[0].question_id, q3);
        // Appended after the existing question, at the former list length.
        assert_eq!(sections[1].questions[1].question_id, q2);
        assert_eq!(numbered(&sections), vec!["Q1", "Q2", "Q3"]);
        assert_eq!(sections[1].questions[1].question_number, "Q3");
    }

    #[test]
    fn numbering_is_gap_free_after_any_move() {
        let (mut sections, _, _, q1, _, q3) = two_sections();

        let outcome = apply_drag(&mut sections, q1, Some(q3));

        assert_eq!(outcome, ReorderOutcome::Moved);
        assert_eq!(numbered(&sections), vec!["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn self_target_is_a_noop() {
        let (mut sections, _, _, q1, _, _) = two_sections();
        let before = sections.clone();

        let outcome = apply_drag(&mut sections, q1, Some(q1));

        assert_eq!(outcome, ReorderOutcome::Ignored(IgnoreReason::SelfTarget));
        assert_eq!(sections, before);
    }

    #[test]
    fn missing_target_is_a_noop() {
        let (mut sections, _, _, q1, _, _) = two_sections();
        let before = sections.clone();

        let outcome = apply_drag(&mut sections, q1, None);

        assert_eq!(outcome, ReorderOutcome::Ignored(IgnoreReason::MissingTarget));
        assert_eq!(sections, before);
    }

    #[test]
    fn unknown_active_is_reported_not_swallowed() {
        let (mut sections, _, section_b, _, _, _) = two_sections();
        let before = sections.clone();

        let outcome = apply_drag(&mut sections, Uuid::new_v4(), Some(section_b));

        assert_eq!(outcome, ReorderOutcome::Ignored(IgnoreReason::UnknownActive));
        assert_eq!(sections, before);
    }

    #[test]
    fn unknown_target_is_reported_not_swallowed() {
        let (mut sections, _, _, q1, _, _) = two_sections();

        let outcome = apply_drag(&mut sections, q1, Some(Uuid::new_v4()));

        assert_eq!(outcome, ReorderOutcome::Ignored(IgnoreReason::UnknownTarget));
    }

    #[test]
    fn sections_swap_via_stable_array_move() {
        let (mut sections, section_a, section_b, _, _, q3) = two_sections();

        let outcome = apply_drag(&mut sections, section_a, Some(section_b));

        assert_eq!(outcome, ReorderOutcome::Moved);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_id, section_b);
        assert_eq!(sections[1].section_id, section_a);
        // Membership unchanged, numbering follows the new order.
        assert_eq!(sections[0].questions[0].question_id, q3);
        assert_eq!(sections[0].questions[0].question_number, "Q1");
        assert_eq!(numbered(&sections), vec!["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn question_onto_question_inserts_at_target_index() {
        let (mut sections, _, _, _, q2, q3) = two_sections();

        // Move Q3 from section B onto Q2 in section A: lands at Q2's index.
        let outcome = apply_drag(&mut sections, q3, Some(q2));

        assert_eq!(outcome, ReorderOutcome::Moved);
        assert!(sections[1].questions.is_empty());
        assert_eq!(sections[0].questions[1].question_id, q3);
        assert_eq!(sections[0].questions[2].question_id, q2);
        assert_eq!(numbered(&sections), vec!["Q1", "Q2", "Q3"]);
    }

    #[test]
    fn fixed_question_cannot_leave_its_section() {
        let (mut sections, _, section_b, q1, _, _) = two_sections();
        sections[0].questions[0].is_fixed = true;
        let before = sections.clone();

        let outcome = apply_drag(&mut sections, q1, Some(section_b));

        assert_eq!(outcome, ReorderOutcome::Ignored(IgnoreReason::FixedQuestion));
        assert_eq!(sections, before);
    }

    #[test]
    fn fixed_question_may_move_within_its_section() {
        let (mut sections, _, _, q1, q2, _) = two_sections();
        sections[0].questions[0].is_fixed = true;

        let outcome = apply_drag(&mut sections, q1, Some(q2));

        assert_eq!(outcome, ReorderOutcome::Moved);
        assert_eq!(sections[0].questions[1].question_id, q1);
    }

    #[test]
    fn move_between_two_populated_sections_renumbers_both() {
        // Section A = [Q1, Q2], Section B = [Q3]; moving Q2 onto B yields
        // A = [Q1], B = [Q3, Q2] renumbered Q2, Q3.
        let (mut sections, _, section_b, q1, q2, q3) = two_sections();

        apply_drag(&mut sections, q2, Some(section_b));

        assert_eq!(sections[0].questions.len(), 1);
        assert_eq!(sections[0].questions[0].question_id, q1);
        assert_eq!(sections[0].questions[0].question_number, "Q1");
        assert_eq!(sections[1].questions[0].question_id, q3);
        assert_eq!(sections[1].questions[0].question_number, "Q2");
        assert_eq!(sections[1].questions[1].question_id, q2);
        assert_eq!(sections[1].questions[1].question_number, "Q3");
    }
}
