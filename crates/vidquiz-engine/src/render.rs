//! Question Renderer
//!
//! Maps a question to a DOM-agnostic interaction surface. Pure apart
//! from the shuffle: kinds that present movable or matchable items get
//! an independent uniform permutation on every render, while
//! multiple-choice options keep their authored order so the stored
//! correct index stays valid.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::question::{
    parse_canonical, AnswerFormatError, CanonicalAnswer, OrderedImage, Question, QuestionKind,
};
use crate::types::BLANK_DELIMITER;

// ==================== Options ====================

/// Renderer configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RendererOptions {
    /// Random seed for reproducible shuffles (optional)
    pub seed: Option<u32>,
}

// ==================== Surfaces ====================

/// One selectable choice: the submitted value plus its display text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// The interaction surface for a question that has not been answered
/// yet. Hosts lay this out however they like; raw-answer updates come
/// back through the session's answer-changed event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionSurface {
    /// Radio options (true/false and multiple choice)
    Choices {
        prompt: String,
        options: Vec<ChoiceOption>,
    },
    /// Free-text input
    TextInput { prompt: String },
    /// Text segments with an input slot between each adjacent pair
    FillBlanks {
        prompt: String,
        segments: Vec<String>,
        blank_count: usize,
    },
    /// Click-to-match columns; the right column is shuffled
    MatchPair {
        prompt: String,
        left: Vec<String>,
        right: Vec<String>,
    },
    /// Image cards plus a shuffled pool of draggable labels
    MatchImageLabel {
        prompt: String,
        images: Vec<String>,
        labels: Vec<String>,
    },
    /// Reorderable item list, shuffled at render time
    OrderItems { prompt: String, items: Vec<String> },
    /// Shuffled source images and numbered answer slots
    OrderImages {
        prompt: String,
        sources: Vec<OrderedImage>,
        slot_count: usize,
    },
}

// ==================== Renderer ====================

/// Builds interaction surfaces. Holds the shuffle RNG so repeated
/// renders produce independent permutations.
pub struct QuestionRenderer {
    rng: ChaCha8Rng,
}

impl QuestionRenderer {
    pub fn new(options: RendererOptions) -> Self {
        let seed = options.seed.unwrap_or_else(|| {
            // Use system time as default seed
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u32)
                .unwrap_or(42)
        });
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
        }
    }

    /// Create a renderer with a specific seed (for testing)
    pub fn with_seed(seed: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
        }
    }

    /// Build the surface for a question. A malformed payload yields
    /// `Err`; the session turns that into an inline error surface
    /// instead of a blank overlay.
    pub fn render(&mut self, question: &Question) -> Result<QuestionSurface, AnswerFormatError> {
        let prompt = question.title.clone();
        match question.kind {
            QuestionKind::TrueFalse => Ok(QuestionSurface::Choices {
                prompt,
                options: vec![
                    ChoiceOption { value: "true".to_string(), label: "True".to_string() },
                    ChoiceOption { value: "false".to_string(), label: "False".to_string() },
                ],
            }),
            QuestionKind::MultipleChoice => {
                let options = question
                    .choice_options()?
                    .into_iter()
                    .enumerate()
                    .map(|(index, label)| ChoiceOption {
                        value: index.to_string(),
                        label,
                    })
                    .collect();
                Ok(QuestionSurface::Choices { prompt, options })
            }
            QuestionKind::ShortAnswer => Ok(QuestionSurface::TextInput { prompt }),
            QuestionKind::FillBlanks => {
                let template = question.blanks_template();
                let blank_count = question.blank_count();
                if blank_count == 0 {
                    return Err(AnswerFormatError::MalformedOptions);
                }
                let segments = template
                    .split(BLANK_DELIMITER)
                    .map(str::to_string)
                    .collect();
                Ok(QuestionSurface::FillBlanks { prompt, segments, blank_count })
            }
            QuestionKind::MatchPair => {
                match parse_canonical(question.kind, &question.correct_answer)? {
                    CanonicalAnswer::Pairs(pairs) => {
                        let left: Vec<String> = pairs.keys().cloned().collect();
                        let mut right: Vec<String> = pairs.values().cloned().collect();
                        right.shuffle(&mut self.rng);
                        Ok(QuestionSurface::MatchPair { prompt, left, right })
                    }
                    _ => Err(AnswerFormatError::ShapeMismatch { kind: question.kind }),
                }
            }
            QuestionKind::MatchImageLabel => {
                match parse_canonical(question.kind, &question.correct_answer)? {
                    CanonicalAnswer::ImageLabels(pairs) => {
                        let images: Vec<String> = pairs.keys().cloned().collect();
                        let mut labels: Vec<String> = pairs.values().cloned().collect();
                        labels.shuffle(&mut self.rng);
                        Ok(QuestionSurface::MatchImageLabel { prompt, images, labels })
                    }
                    _ => Err(AnswerFormatError::ShapeMismatch { kind: question.kind }),
                }
            }
            QuestionKind::DragDrop | QuestionKind::Sorting => {
                match parse_canonical(question.kind, &question.correct_answer)? {
                    CanonicalAnswer::Ordering(mut items) => {
                        items.shuffle(&mut self.rng);
                        Ok(QuestionSurface::OrderItems { prompt, items })
                    }
                    _ => Err(AnswerFormatError::ShapeMismatch { kind: question.kind }),
                }
            }
            QuestionKind::DragDropImage => {
                match parse_canonical(question.kind, &question.correct_answer)? {
                    CanonicalAnswer::ImageOrdering(items) => {
                        let slot_count = items.len();
                        let mut sources = items;
                        sources.shuffle(&mut self.rng);
                        Ok(QuestionSurface::OrderImages { prompt, sources, slot_count })
                    }
                    _ => Err(AnswerFormatError::ShapeMismatch { kind: question.kind }),
                }
            }
            QuestionKind::Unknown => Err(AnswerFormatError::UnknownKind),
        }
    }
}

impl Default for QuestionRenderer {
    fn default() -> Self {
        Self::new(RendererOptions::default())
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionKind, correct_answer: &str) -> Question {
        Question {
            id: 1,
            title: "Prompt".to_string(),
            kind,
            options: None,
            correct_answer: correct_answer.to_string(),
            explanation: None,
        }
    }

    #[test]
    fn test_true_false_surface_is_fixed() {
        let mut renderer = QuestionRenderer::with_seed(7);
        let surface = renderer.render(&question(QuestionKind::TrueFalse, "true")).unwrap();
        match surface {
            QuestionSurface::Choices { options, .. } => {
                assert_eq!(options[0].value, "true");
                assert_eq!(options[1].value, "false");
            }
            other => panic!("unexpected surface: {:?}", other),
        }
    }

    #[test]
    fn test_multiple_choice_keeps_authored_order() {
        let mut q = question(QuestionKind::MultipleChoice, "0");
        q.options = Some(r#"["Alpha", "Beta", "Gamma"]"#.to_string());
        // Different seeds, same order: multiple choice never shuffles.
        for seed in [1, 2, 99] {
            let mut renderer = QuestionRenderer::with_seed(seed);
            let surface = renderer.render(&q).unwrap();
            match surface {
                QuestionSurface::Choices { options, .. } => {
                    let labels: Vec<_> = options.iter().map(|o| o.label.as_str()).collect();
                    assert_eq!(labels, ["Alpha", "Beta", "Gamma"]);
                    let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
                    assert_eq!(values, ["0", "1", "2"]);
                }
                other => panic!("unexpected surface: {:?}", other),
            }
        }
    }

    #[test]
    fn test_fill_blanks_segments() {
        let mut q = question(QuestionKind::FillBlanks, r#"["sky"]"#);
        q.options = Some("The _____ is blue".to_string());
        let surface = QuestionRenderer::with_seed(1).render(&q).unwrap();
        match surface {
            QuestionSurface::FillBlanks { segments, blank_count, .. } => {
                assert_eq!(segments, vec!["The ".to_string(), " is blue".to_string()]);
                assert_eq!(blank_count, 1);
            }
            other => panic!("unexpected surface: {:?}", other),
        }
    }

    #[test]
    fn test_fill_blanks_without_template_is_render_error() {
        let q = question(QuestionKind::FillBlanks, r#"["sky"]"#);
        assert_eq!(
            QuestionRenderer::with_seed(1).render(&q),
            Err(AnswerFormatError::MalformedOptions)
        );
    }

    #[test]
    fn test_match_pair_right_column_is_permutation() {
        let q = question(
            QuestionKind::MatchPair,
            r#"{"a": "1", "b": "2", "c": "3", "d": "4", "e": "5"}"#,
        );
        let surface = QuestionRenderer::with_seed(3).render(&q).unwrap();
        match surface {
            QuestionSurface::MatchPair { left, right, .. } => {
                assert_eq!(left, vec!["a", "b", "c", "d", "e"]);
                let mut sorted = right.clone();
                sorted.sort();
                assert_eq!(sorted, vec!["1", "2", "3", "4", "5"]);
            }
            other => panic!("unexpected surface: {:?}", other),
        }
    }

    #[test]
    fn test_order_items_shuffle_is_a_permutation() {
        let q = question(
            QuestionKind::Sorting,
            r#"["a", "b", "c", "d", "e", "f", "g", "h"]"#,
        );
        let surface = QuestionRenderer::with_seed(11).render(&q).unwrap();
        match surface {
            QuestionSurface::OrderItems { items, .. } => {
                let mut sorted = items.clone();
                sorted.sort();
                assert_eq!(sorted, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);
            }
            other => panic!("unexpected surface: {:?}", other),
        }
    }

    #[test]
    fn test_renders_differ_across_invocations() {
        let q = question(
            QuestionKind::Sorting,
            r#"["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]"#,
        );
        let mut renderer = QuestionRenderer::with_seed(5);
        let mut orders = Vec::new();
        for _ in 0..4 {
            match renderer.render(&q).unwrap() {
                QuestionSurface::OrderItems { items, .. } => orders.push(items),
                other => panic!("unexpected surface: {:?}", other),
            }
        }
        // With 10 items the chance of four identical draws is nil.
        assert!(orders.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_order_images_slot_count_matches_canonical() {
        let q = question(
            QuestionKind::DragDropImage,
            r#"[{"id": 1, "url": "a"}, {"id": 2, "url": "b"}, {"id": 3, "url": "c"}]"#,
        );
        let surface = QuestionRenderer::with_seed(1).render(&q).unwrap();
        match surface {
            QuestionSurface::OrderImages { sources, slot_count, .. } => {
                assert_eq!(slot_count, 3);
                let mut ids: Vec<_> = sources.iter().map(|s| s.id).collect();
                ids.sort_unstable();
                assert_eq!(ids, vec![1, 2, 3]);
            }
            other => panic!("unexpected surface: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_payload_is_error_not_panic() {
        let q = question(QuestionKind::DragDropImage, "{broken");
        assert!(QuestionRenderer::with_seed(1).render(&q).is_err());

        let q = question(QuestionKind::Unknown, "x");
        assert_eq!(
            QuestionRenderer::with_seed(1).render(&q),
            Err(AnswerFormatError::UnknownKind)
        );
    }
}
