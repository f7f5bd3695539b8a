//! Trivia questions for the combat loop.
//!
//! The engine never looks at question content: combat only consumes whether an answer was
//! correct and, optionally, the category label for accuracy statistics. Anything that
//! implements [`TriviaProvider`] can feed the game. [`BuiltinBank`] is a small fixed bank
//! used by the CLI.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    /// Index into `options`.
    Choice { options: Vec<String>, correct: usize },
    /// Free text, compared case-insensitively after trimming.
    Typed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub answer: Answer,
    pub category: String,
    pub difficulty: Difficulty,
}

pub trait TriviaProvider: Send + Sync {
    fn question_for_zone(&self, zone: u32, rng: &mut dyn rand::RngCore) -> Question;

    /// Multiple-choice questions accept the 1-based option number or the option text.
    fn check_answer(&self, question: &Question, response: &str) -> bool {
        let response = response.trim();
        match &question.answer {
            Answer::Choice { options, correct } => {
                if let Ok(n) = response.parse::<usize>() {
                    return n >= 1 && n - 1 == *correct;
                }
                options
                    .get(*correct)
                    .map(|o| o.eq_ignore_ascii_case(response))
                    .unwrap_or(false)
            }
            Answer::Typed(expected) => expected.trim().eq_ignore_ascii_case(response),
        }
    }
}

/// Difficulty mix by zone: easy only up to zone 10, then 70/30 easy/medium up to 25,
/// then 40/40/20 easy/medium/hard.
pub fn difficulty_for_zone<R: Rng + ?Sized>(zone: u32, rng: &mut R) -> Difficulty {
    let roll: f64 = rng.gen();
    match zone {
        0..=10 => Difficulty::Easy,
        11..=25 if roll < 0.7 => Difficulty::Easy,
        11..=25 => Difficulty::Medium,
        _ if roll < 0.4 => Difficulty::Easy,
        _ if roll < 0.8 => Difficulty::Medium,
        _ => Difficulty::Hard,
    }
}

type Entry = (&'static str, &'static [&'static str], usize, &'static str, Difficulty);

const CHOICES: &[Entry] = &[
    ("What is 2 + 2?", &["3", "4", "5", "6"], 1, "Math", Difficulty::Easy),
    ("What is 5 x 2?", &["8", "10", "12", "15"], 1, "Math", Difficulty::Easy),
    ("What is 12 x 12?", &["124", "132", "144", "156"], 2, "Math", Difficulty::Medium),
    ("What is the square root of 169?", &["11", "12", "13", "14"], 2, "Math", Difficulty::Hard),
    ("What color do you get mixing blue and yellow?", &["Green", "Purple", "Orange", "Brown"], 0, "Art", Difficulty::Easy),
    ("Which planet is closest to the Sun?", &["Venus", "Mercury", "Mars", "Earth"], 1, "Science", Difficulty::Easy),
    ("What gas do plants absorb from the air?", &["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"], 2, "Science", Difficulty::Medium),
    ("What is the chemical symbol for gold?", &["Go", "Gd", "Au", "Ag"], 2, "Science", Difficulty::Hard),
    ("Which ocean is the largest?", &["Atlantic", "Indian", "Arctic", "Pacific"], 3, "Geography", Difficulty::Easy),
    ("What is the capital of Australia?", &["Sydney", "Melbourne", "Canberra", "Perth"], 2, "Geography", Difficulty::Medium),
    ("How many legs does a spider have?", &["6", "8", "10", "12"], 1, "Animals", Difficulty::Easy),
    ("Who painted the Mona Lisa?", &["Van Gogh", "Da Vinci", "Picasso", "Monet"], 1, "Art", Difficulty::Medium),
    ("In what year did the first person walk on the Moon?", &["1965", "1969", "1972", "1959"], 1, "History", Difficulty::Hard),
];

const TYPED: &[(&str, &str, &str, Difficulty)] = &[
    ("How many minutes are in one hour?", "60", "Math", Difficulty::Easy),
    ("What is half of 10?", "5", "Math", Difficulty::Easy),
    ("How many days are in a week?", "7", "Math", Difficulty::Easy),
    ("What is the largest mammal on Earth?", "blue whale", "Animals", Difficulty::Medium),
    ("What is the hardest natural substance?", "diamond", "Science", Difficulty::Hard),
    ("In which movie would you hear \"May the Force be with you\"?", "star wars", "Entertainment", Difficulty::Medium),
];

/// The built-in question bank.
#[derive(Debug, Clone)]
pub struct BuiltinBank {
    questions: Vec<Question>,
}

impl Default for BuiltinBank {
    fn default() -> Self {
        let mut questions = Vec::with_capacity(CHOICES.len() + TYPED.len());
        for (prompt, options, correct, category, difficulty) in CHOICES {
            questions.push(Question {
                id: questions.len() as u32 + 1,
                prompt: (*prompt).to_string(),
                answer: Answer::Choice {
                    options: options.iter().map(|o| (*o).to_string()).collect(),
                    correct: *correct,
                },
                category: (*category).to_string(),
                difficulty: *difficulty,
            });
        }
        for (prompt, answer, category, difficulty) in TYPED {
            questions.push(Question {
                id: questions.len() as u32 + 1,
                prompt: (*prompt).to_string(),
                answer: Answer::Typed((*answer).to_string()),
                category: (*category).to_string(),
                difficulty: *difficulty,
            });
        }
        Self { questions }
    }
}

impl BuiltinBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

impl TriviaProvider for BuiltinBank {
    fn question_for_zone(&self, zone: u32, rng: &mut dyn rand::RngCore) -> Question {
        let difficulty = difficulty_for_zone(zone, &mut *rng);
        let pool: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .collect();
        // every difficulty has entries, but fall back to the whole bank regardless
        pool.choose(&mut *rng)
            .map(|q| (*q).clone())
            .or_else(|| self.questions.choose(rng).cloned())
            .unwrap_or_else(|| Question {
                id: 0,
                prompt: "What is 1 + 1?".to_string(),
                answer: Answer::Typed("2".to_string()),
                category: "Math".to_string(),
                difficulty: Difficulty::Easy,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn low_zones_only_ask_easy_questions() {
        let bank = BuiltinBank::new();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(bank.question_for_zone(4, &mut rng).difficulty, Difficulty::Easy);
        }
    }

    #[test]
    fn choice_accepts_number_or_text() {
        let bank = BuiltinBank::new();
        let q = &bank.questions()[0];
        assert!(bank.check_answer(q, "2"));
        assert!(!bank.check_answer(q, "1"));
        assert!(!bank.check_answer(q, "0"));

        let colors = &bank.questions()[4];
        assert!(bank.check_answer(colors, " green "));
        assert!(bank.check_answer(colors, "1"));
        assert!(!bank.check_answer(colors, "Purple"));
    }

    #[test]
    fn typed_answers_ignore_case() {
        let bank = BuiltinBank::new();
        let q = bank
            .questions()
            .iter()
            .find(|q| q.answer == Answer::Typed("star wars".to_string()))
            .unwrap();
        assert!(bank.check_answer(q, "  Star Wars"));
        assert!(!bank.check_answer(q, "star trek"));
    }

    #[test]
    fn high_zones_mix_difficulties() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(format!("{:?}", difficulty_for_zone(40, &mut rng)));
        }
        assert_eq!(seen.len(), 3);
    }
}
