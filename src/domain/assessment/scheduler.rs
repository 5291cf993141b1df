//! Phase scheduling: maps a 0-based question order onto an element and phase.
//!
//! An assessment is split into phases of `questions_per_phase` questions. Each
//! phase belongs to one element, elements rotate `1..=element_count`, and the
//! first question of every phase is a canned opener instead of a generated one.

use serde::{Deserialize, Serialize};

use super::element::{ElementId, DEFAULT_ELEMENT_COUNT};
use crate::domain::foundation::ValidationError;

/// Questions per set in data-collection mode.
pub const DATA_COLLECTION_QUESTIONS_PER_SET: u32 = 10;

/// Sets (full element rotations are not required) in data-collection mode.
pub const DATA_COLLECTION_TOTAL_SETS: u32 = 5;

/// Where one question order falls in the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSlot {
    pub element_id: ElementId,
    pub is_phase_start: bool,
    /// 1-based phase number.
    pub phase_number: u32,
    /// 1-based position inside the phase.
    pub position_in_phase: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseScheduler {
    questions_per_phase: u32,
    element_count: u32,
    phase_count: u32,
}

impl PhaseScheduler {
    pub fn new(
        questions_per_phase: u32,
        element_count: u32,
        phase_count: u32,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("questions_per_phase", questions_per_phase),
            ("element_count", element_count),
            ("phase_count", phase_count),
        ] {
            if value == 0 {
                return Err(ValidationError::out_of_range(
                    field,
                    1,
                    i64::from(u32::MAX),
                    0,
                ));
            }
        }
        Ok(Self {
            questions_per_phase,
            element_count,
            phase_count,
        })
    }

    /// One phase per element.
    pub fn standard(questions_per_phase: u32, element_count: u32) -> Result<Self, ValidationError> {
        Self::new(questions_per_phase, element_count, element_count)
    }

    /// Ten questions per set, five sets over the four elements.
    pub fn data_collection() -> Self {
        Self {
            questions_per_phase: DATA_COLLECTION_QUESTIONS_PER_SET,
            element_count: DEFAULT_ELEMENT_COUNT,
            phase_count: DATA_COLLECTION_TOTAL_SETS,
        }
    }

    pub fn questions_per_phase(&self) -> u32 {
        self.questions_per_phase
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn phase_count(&self) -> u32 {
        self.phase_count
    }

    pub fn total_questions(&self) -> u32 {
        self.questions_per_phase * self.phase_count
    }

    /// Classifies a 0-based order. Negative orders behave like order 0.
    pub fn classify(&self, order: i64) -> PhaseSlot {
        let order = order.max(0) as u64;
        let q = u64::from(self.questions_per_phase);
        let phase_index = order / q;
        let element = (phase_index % u64::from(self.element_count)) + 1;

        PhaseSlot {
            element_id: ElementId::clamped(element as i64, self.element_count),
            is_phase_start: order % q == 0,
            phase_number: (phase_index + 1) as u32,
            position_in_phase: (order % q + 1) as u32,
        }
    }

    pub fn element_for(&self, order: i64) -> ElementId {
        self.classify(order).element_id
    }

    pub fn is_phase_start(&self, order: i64) -> bool {
        self.classify(order).is_phase_start
    }

    pub fn is_complete(&self, order: i64) -> bool {
        order >= i64::from(self.total_questions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_zero_sized_phases() {
        assert!(PhaseScheduler::new(0, 4, 4).is_err());
        assert!(PhaseScheduler::new(8, 0, 4).is_err());
        assert!(PhaseScheduler::standard(8, 4).is_ok());
    }

    #[test]
    fn standard_total_is_q_times_elements() {
        let scheduler = PhaseScheduler::standard(10, 4).unwrap();
        assert_eq!(scheduler.total_questions(), 40);
        assert!(!scheduler.is_complete(39));
        assert!(scheduler.is_complete(40));
    }

    #[test]
    fn ten_per_phase_yields_ten_of_each_element() {
        let scheduler = PhaseScheduler::standard(10, 4).unwrap();
        let elements: Vec<u32> = (0..40).map(|o| scheduler.element_for(o).value()).collect();

        let mut expected = vec![1; 10];
        expected.extend(vec![2; 10]);
        expected.extend(vec![3; 10]);
        expected.extend(vec![4; 10]);
        assert_eq!(elements, expected);
    }

    #[test]
    fn order_ten_starts_element_two() {
        let slot = PhaseScheduler::standard(10, 4).unwrap().classify(10);
        assert_eq!(slot.element_id.value(), 2);
        assert!(slot.is_phase_start);
        assert_eq!(slot.phase_number, 2);
        assert_eq!(slot.position_in_phase, 1);
    }

    #[test]
    fn negative_order_is_phase_start_of_first_element() {
        let slot = PhaseScheduler::standard(8, 4).unwrap().classify(-3);
        assert_eq!(slot.element_id, ElementId::FIRST);
        assert!(slot.is_phase_start);
    }

    #[test]
    fn data_collection_rotates_back_to_first_element() {
        let scheduler = PhaseScheduler::data_collection();
        assert_eq!(scheduler.total_questions(), 50);
        assert_eq!(scheduler.element_for(39).value(), 4);
        assert_eq!(scheduler.element_for(40).value(), 1);
        assert!(scheduler.is_phase_start(40));
        assert_eq!(scheduler.classify(49).phase_number, 5);
    }

    proptest! {
        #[test]
        fn phase_start_iff_multiple_of_q(q in 1u32..20, order in 0i64..400) {
            let scheduler = PhaseScheduler::standard(q, 4).unwrap();
            prop_assert_eq!(scheduler.is_phase_start(order), order % i64::from(q) == 0);
        }

        #[test]
        fn element_cycles_every_q_questions(q in 1u32..20, order in 0i64..400) {
            let scheduler = PhaseScheduler::standard(q, 4).unwrap();
            let expected = (order / i64::from(q)) % 4 + 1;
            prop_assert_eq!(i64::from(scheduler.element_for(order).value()), expected);
        }

        #[test]
        fn element_stays_within_range(q in 1u32..20, count in 1u32..8, order in -50i64..500) {
            let scheduler = PhaseScheduler::standard(q, count).unwrap();
            let element = scheduler.element_for(order).value();
            prop_assert!(element >= 1 && element <= count);
        }
    }
}
