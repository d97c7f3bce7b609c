//! Interactive question loop.

use docrag::{ChatTurn, RagPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::output::format_answer;

const PROMPT: &str = "docrag> ";

/// Earlier turns sent along with each question.
pub const MAX_HISTORY_TURNS: usize = 10;

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput<'a> {
    /// Leave the loop.
    Exit,
    /// Nothing to do.
    Empty,
    /// A question, trimmed.
    Question(&'a str),
}

/// Classify one input line. `exit` and `quit` match case-insensitively.
pub fn parse_input(line: &str) -> ReplInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        ReplInput::Empty
    } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        ReplInput::Exit
    } else {
        ReplInput::Question(line)
    }
}

/// Rolling window of the most recent turns.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// Record a question and its answer, dropping the oldest turns past the cap.
    pub fn record(&mut self, question: &str, answer: &str) {
        self.turns.push(ChatTurn::user(question));
        self.turns.push(ChatTurn::assistant(answer));
        let excess = self.turns.len().saturating_sub(MAX_HISTORY_TURNS);
        self.turns.drain(..excess);
    }

    /// Turns to send with the next question, oldest first.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }
}

/// Read questions until `exit`, `quit`, Ctrl-C or Ctrl-D.
///
/// A failed question prints its error and the loop continues.
pub async fn run(pipeline: &RagPipeline, top_k: usize) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut conversation = Conversation::default();

    println!("Ask about the documentation. Type `exit` or `quit` to leave.");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let question = match parse_input(&line) {
            ReplInput::Exit => break,
            ReplInput::Empty => continue,
            ReplInput::Question(question) => question,
        };
        let _ = editor.add_history_entry(question);

        match pipeline.answer(question, top_k, conversation.turns()).await {
            Ok(answer) => {
                println!("\n{}\n", format_answer(&answer));
                conversation.record(question, &answer.answer);
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }

    println!("Bye.");
    Ok(())
}
