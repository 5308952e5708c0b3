use std::collections::HashMap;
use std::ops::Range;

use thiserror::Error;
use tracing::trace;

use crate::constants::{Address, Word, MEMORY_LIMIT};
use crate::parser::line::{Line, LineContent};
use crate::parser::location::Located;

pub(crate) type Labels<'a> = HashMap<&'a str, Address>;

pub(crate) enum Placement<'a> {
    /// Zeroed memory cells reserved by .space
    Reserved(usize),

    /// An instruction or a .word directive, with the location of its line
    Line(&'a LineContent<'a>, Range<usize>),
}

impl Placement<'_> {
    /// Number of memory cells taken by the placement
    fn size(&self) -> usize {
        match self {
            Placement::Reserved(size) => *size,
            Placement::Line(LineContent::Directive { .. }, _) => 1,
            Placement::Line(LineContent::Instruction { arguments, .. }, _) => 1 + arguments.len(),
        }
    }
}

/// Memory layout of a program: where labels point, and what goes in memory,
/// in order.
#[derive(Default)]
pub(crate) struct Layout<'a> {
    pub labels: Labels<'a>,
    pub placements: Vec<Placement<'a>>,
    pub size: usize,
}

impl<'a> Layout<'a> {
    fn insert_placement(&mut self, placement: Placement<'a>) {
        self.size += placement.size();
        self.placements.push(placement);
    }

    fn insert_label(
        &mut self,
        label: &'a str,
        location: &Range<usize>,
    ) -> Result<(), MemoryLayoutError> {
        if self.labels.contains_key(label) {
            return Err(MemoryLayoutError::DuplicateLabel {
                label: label.to_owned(),
                location: location.clone(),
            });
        }

        trace!(label, address = self.size, "Placing label");
        self.labels.insert(label, self.size);
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryLayoutError {
    #[error("duplicate label {label}")]
    DuplicateLabel {
        label: String,
        location: Range<usize>,
    },

    #[error("invalid argument {argument} for directive {directive}")]
    InvalidDirectiveArgument {
        directive: String,
        argument: Word,
        location: Range<usize>,
    },

    #[error("unsupported directive {directive}")]
    UnsupportedDirective {
        directive: String,
        location: Range<usize>,
    },
}

impl MemoryLayoutError {
    #[must_use]
    pub fn location(&self) -> &Range<usize> {
        match self {
            MemoryLayoutError::DuplicateLabel { location, .. }
            | MemoryLayoutError::InvalidDirectiveArgument { location, .. }
            | MemoryLayoutError::UnsupportedDirective { location, .. } => location,
        }
    }
}

/// Lays out the memory
///
/// It places the labels and lists the cells to be filled. Instructions take
/// one cell plus one per operand, whatever their mnemonic is: checking the
/// operand count is the job of the filling pass.
pub(crate) fn layout_memory<'a>(
    program: &'a [Located<Line<'a>>],
) -> Result<Layout<'a>, MemoryLayoutError> {
    let mut layout = Layout::default();

    for located in program {
        trace!(line = %located, "Laying out line");
        let Located { inner: line, location } = located;

        for label in &line.symbols {
            layout.insert_label(*label, location)?;
        }

        let Some(ref content) = line.content else {
            continue;
        };

        match content {
            LineContent::Directive {
                directive: "word", ..
            }
            | LineContent::Instruction { .. } => {
                layout.insert_placement(Placement::Line(content, location.clone()));
            }

            LineContent::Directive {
                directive: "space",
                argument,
            } => {
                let size = usize::try_from(*argument)
                    .ok()
                    .filter(|size| *size <= MEMORY_LIMIT.saturating_sub(layout.size))
                    .ok_or_else(|| MemoryLayoutError::InvalidDirectiveArgument {
                        directive: String::from("space"),
                        argument: *argument,
                        location: location.clone(),
                    })?;

                layout.insert_placement(Placement::Reserved(size));
            }

            LineContent::Directive { directive, .. } => {
                return Err(MemoryLayoutError::UnsupportedDirective {
                    directive: (*directive).to_owned(),
                    location: location.clone(),
                });
            }
        }
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::location::Locatable;
    use crate::parser::value::{Argument, Value};

    fn located(lines: Vec<Line<'_>>) -> Vec<Located<Line<'_>>> {
        lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| line.with_location(i..i + 1))
            .collect()
    }

    #[test]
    fn layout_labels_test() {
        let program = located(vec![
            Line::default().symbol("start").instruction(
                "add",
                vec![
                    Argument::immediate(Value::Literal(1)),
                    Argument::immediate(Value::Literal(2)),
                    Argument::with_specifier("P", Value::Label("x")),
                ],
            ),
            Line::default().comment("# nothing here"),
            Line::default().symbol("end").instruction("halt", vec![]),
            Line::default().symbol("x").symbol("y").directive("word", 7),
            Line::default().directive("space", 3),
            Line::default().symbol("z").directive("word", 0),
        ]);

        let layout = layout_memory(&program).unwrap();
        assert_eq!(layout.labels.get("start"), Some(&0));
        assert_eq!(layout.labels.get("end"), Some(&4));
        assert_eq!(layout.labels.get("x"), Some(&5));
        assert_eq!(layout.labels.get("y"), Some(&5));
        assert_eq!(layout.labels.get("z"), Some(&9));
        assert_eq!(layout.placements.len(), 5);
        assert_eq!(layout.size, 10);
    }

    #[test]
    fn duplicate_label_test() {
        let program = located(vec![
            Line::default().symbol("hello").directive("word", 1),
            Line::default().symbol("hello").directive("word", 2),
        ]);

        assert_eq!(
            layout_memory(&program).err(),
            Some(MemoryLayoutError::DuplicateLabel {
                label: String::from("hello"),
                location: 1..2,
            })
        );
    }

    #[test]
    fn invalid_directive_test() {
        let program = located(vec![Line::default().directive("space", -2)]);
        assert_eq!(
            layout_memory(&program).err(),
            Some(MemoryLayoutError::InvalidDirectiveArgument {
                directive: String::from("space"),
                argument: -2,
                location: 0..1,
            })
        );

        let program = located(vec![
            Line::default().directive("word", 1),
            Line::default().directive("space", Word::MAX),
        ]);
        assert_eq!(
            layout_memory(&program).err(),
            Some(MemoryLayoutError::InvalidDirectiveArgument {
                directive: String::from("space"),
                argument: Word::MAX,
                location: 1..2,
            })
        );

        let program = located(vec![Line::default().directive("unsupported", 3)]);
        let err = layout_memory(&program).err().unwrap();
        assert_eq!(err.location(), &(0..1));
        assert_eq!(err.to_string(), "unsupported directive unsupported");
    }
}
