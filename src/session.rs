//! Interactive question entry.
//!
//! [`QuestionCollector`] is a small line-driven state machine; the CLI feeds
//! it one stdin line at a time and acts on the returned [`Step`].

/// What the caller should do after feeding a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep reading; the argument is the 1-based number of the next question.
    Continue(usize),
    /// `done` was entered with at least one question collected.
    Ask(Vec<String>),
    /// `done` was entered with nothing collected; start over.
    Empty,
    /// `exit` was entered.
    Exit,
}

#[derive(Debug, Default)]
pub struct QuestionCollector {
    questions: Vec<String>,
}

impl QuestionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number shown in the next `Question N:` prompt.
    pub fn next_number(&self) -> usize {
        self.questions.len() + 1
    }

    /// Consume one input line.
    ///
    /// `done` and `exit` are matched case-insensitively on the raw line;
    /// blank lines are ignored.
    pub fn feed(&mut self, line: &str) -> Step {
        let lowered = line.to_lowercase();
        if lowered == "done" {
            let questions = std::mem::take(&mut self.questions);
            return if questions.is_empty() {
                Step::Empty
            } else {
                Step::Ask(questions)
            };
        }
        if lowered == "exit" {
            return Step::Exit;
        }
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            self.questions.push(trimmed.to_string());
        }
        Step::Continue(self.next_number())
    }
}

/// Whether a search-loop line is the `exit` sentinel.
pub fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}
