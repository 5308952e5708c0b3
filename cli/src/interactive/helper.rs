use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};

use anstyle::Style;
use clap::{Command, CommandFactory};
use rustyline::{
    completion::Completer,
    highlight::Highlighter,
    hint::Hinter,
    validate::{ValidationContext, ValidationResult, Validator},
    Context,
};
use rustyline_derive::Helper;

/// Rustyline helper, that handles interactive completion, highlighting and hinting.
#[derive(Helper, Debug)]
pub(crate) struct RunHelper<T: CommandFactory> {
    app: std::marker::PhantomData<T>,

    /// Labels of the program, suggested for address arguments
    labels: BTreeSet<String>,
}

impl<T: CommandFactory> RunHelper<T> {
    pub fn new(labels: impl IntoIterator<Item = String>) -> Self {
        RunHelper {
            app: std::marker::PhantomData,
            labels: labels.into_iter().map(|label| format!("*{label}")).collect(),
        }
    }

    fn suggest(&self, command: &Command, input: &[String]) -> (usize, HashSet<String>) {
        // We're building the suggestions here
        // The only downside is that it's wasted work if we're not on the first word (second
        // pattern of the match bellow)
        let mut suggestions: HashSet<_> = command
            .get_subcommands()
            .flat_map(|cmd| {
                std::iter::once(cmd.get_name().to_string())
                    .chain(cmd.get_visible_aliases().map(ToString::to_string))
            })
            .collect();

        // If the app has subcommands, it has a `help` command
        if command.has_subcommands() {
            suggestions.insert("help".to_string());
        }

        let index = input.len().saturating_sub(1);

        // Find the corresponding positional arg if it exists and add suggestions for it
        if let Some(arg) = command.get_positionals().nth(index) {
            match arg.get_id().as_str() {
                "register" => suggestions.extend(["%ip", "%rb"].map(String::from)),
                "address" => {
                    suggestions.extend(["%ip", "%rb"].map(String::from));
                    suggestions.extend(self.labels.iter().cloned());
                }
                _ => {}
            }
        }

        match input {
            [last] => (
                last.len(),
                suggestions
                    .into_iter()
                    .filter(|alias| alias.starts_with(last))
                    .collect(),
            ),

            [head, tail @ ..] => command
                .find_subcommand(head)
                .map(|sub: &Command| self.suggest(sub, tail))
                .unwrap_or_default(),

            [] => (0, suggestions),
        }
    }

    /// Split the line up to the cursor, and suggest what the last word could be
    fn suggestions(&self, line: &str) -> Option<(usize, HashSet<String>)> {
        // Line is considered "complete" if the last char is a space
        let complete = line
            .bytes()
            .last()
            .filter(|&c| c == b' ' || c == b'\t')
            .is_some();
        let mut words = shell_words::split(line).ok()?;

        // If the last char was a space, insert an empty word to autocomplete the next word
        if complete {
            words.push(String::new());
        }

        let app = T::command();
        Some(self.suggest(&app, words.as_slice()))
    }
}

impl<T: CommandFactory> Completer for RunHelper<T> {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        match self.suggestions(&line[..pos]) {
            Some((offset, candidates)) => {
                let mut candidates: Vec<_> = candidates.into_iter().collect();
                candidates.sort_unstable();
                Ok((pos - offset, candidates))
            }
            None => Ok((0, Vec::new())),
        }
    }
}

impl<T: CommandFactory> Highlighter for RunHelper<T> {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        let style = Style::new().dimmed();
        Cow::Owned(format!("{style}{hint}{style:#}"))
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        let style = Style::new().bold();
        Cow::Owned(format!("{style}{prompt}{style:#}"))
    }
}

impl<T: CommandFactory> Hinter for RunHelper<T> {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let (offset, candidates) = self.suggestions(&line[..pos])?;

        if candidates.len() == 1 {
            candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.get(offset..).map(ToString::to_string))
        } else {
            None
        }
    }
}

impl<T: CommandFactory> Validator for RunHelper<T> {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        let res = shell_words::split(input);
        if res.is_err() {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}
