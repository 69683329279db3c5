//! Replacement templates for placeholder transformations
//!
//! A replacement template is compiled once into a list of [`Piece`]s and then
//! expanded for every regex match:
//!
//! - `$N` inserts capture group `N` (empty when unset or out of range)
//! - `\u` / `\l` fold the next emitted character
//! - `\U` / `\L` fold every following character until `\E`
//! - `(?N:set:unset)` picks a branch depending on whether group `N` matched
//! - `\n` and `\t` stay as the two characters `\n` and `\t`; any other
//!   escaped character stands for itself

use chumsky::prelude::*;
use regex::Captures;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseDirective {
    UpperNext,
    LowerNext,
    Upper,
    Lower,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Literal(String),
    Group(usize),
    Case(CaseDirective),
    Conditional {
        group: usize,
        if_set: Vec<Piece>,
        if_unset: Vec<Piece>,
    },
}

/// A compiled replacement template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pieces: Vec<Piece>,
}

impl Replacement {
    /// Compile a replacement template. Anything that is not a recognised
    /// construct is kept as literal text, so compilation never fails.
    pub fn parse(template: &str) -> Self {
        let pieces = replacement_parser()
            .parse(template)
            .into_result()
            .unwrap_or_else(|_| vec![Piece::Literal(template.to_string())]);
        Self {
            pieces: merge_literals(pieces),
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Expand the template for one match
    pub fn expand(&self, caps: &Captures<'_>) -> String {
        let mut out = CaseWriter::default();
        for piece in &self.pieces {
            emit(piece, caps, &mut out);
        }
        out.buf
    }
}

fn emit(piece: &Piece, caps: &Captures<'_>, out: &mut CaseWriter) {
    match piece {
        Piece::Literal(s) => out.push(s),
        Piece::Group(n) => out.push(caps.get(*n).map_or("", |m| m.as_str())),
        Piece::Case(directive) => out.directive(*directive),
        Piece::Conditional {
            group,
            if_set,
            if_unset,
        } => {
            let branch = if caps.get(*group).is_some() {
                if_set
            } else {
                if_unset
            };
            for piece in branch {
                emit(piece, caps, out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fold {
    Upper,
    Lower,
}

/// Output buffer carrying the current case mode
#[derive(Debug, Default)]
struct CaseWriter {
    buf: String,
    one_shot: Option<Fold>,
    persistent: Option<Fold>,
}

impl CaseWriter {
    fn directive(&mut self, directive: CaseDirective) {
        match directive {
            CaseDirective::UpperNext => self.one_shot = Some(Fold::Upper),
            CaseDirective::LowerNext => self.one_shot = Some(Fold::Lower),
            CaseDirective::Upper => self.persistent = Some(Fold::Upper),
            CaseDirective::Lower => self.persistent = Some(Fold::Lower),
            CaseDirective::End => {
                self.one_shot = None;
                self.persistent = None;
            }
        }
    }

    fn push(&mut self, s: &str) {
        for c in s.chars() {
            match self.one_shot.take().or(self.persistent) {
                Some(Fold::Upper) => self.buf.extend(c.to_uppercase()),
                Some(Fold::Lower) => self.buf.extend(c.to_lowercase()),
                None => self.buf.push(c),
            }
        }
    }
}

fn merge_literals(pieces: Vec<Piece>) -> Vec<Piece> {
    let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let piece = match piece {
            Piece::Conditional {
                group,
                if_set,
                if_unset,
            } => Piece::Conditional {
                group,
                if_set: merge_literals(if_set),
                if_unset: merge_literals(if_unset),
            },
            other => other,
        };
        match (merged.last_mut(), piece) {
            (Some(Piece::Literal(prev)), Piece::Literal(next)) => prev.push_str(&next),
            (_, piece) => merged.push(piece),
        }
    }
    merged
}

fn escaped(c: char) -> Piece {
    match c {
        'n' => Piece::Literal("\\n".to_string()),
        't' => Piece::Literal("\\t".to_string()),
        c => Piece::Literal(c.to_string()),
    }
}

fn replacement_parser<'a>() -> impl Parser<'a, &'a str, Vec<Piece>, extra::Err<Rich<'a, char>>> {
    let number = any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|digits: String| digits.parse::<usize>().unwrap_or(usize::MAX));

    let group = just('$').ignore_then(number.clone()).map(Piece::Group);

    let escape = just('\\').ignore_then(any()).map(escaped);

    let case = just('\\').ignore_then(one_of("ulULE")).map(|c: char| {
        Piece::Case(match c {
            'u' => CaseDirective::UpperNext,
            'l' => CaseDirective::LowerNext,
            'U' => CaseDirective::Upper,
            'L' => CaseDirective::Lower,
            _ => CaseDirective::End,
        })
    });

    // Branch text stops at an unescaped `:` or `)`
    let branch = choice((
        group.clone(),
        escape.clone(),
        just('$').to(Piece::Literal("$".to_string())),
        none_of("\\$:)").map(|c: char| Piece::Literal(c.to_string())),
    ))
    .repeated()
    .collect::<Vec<_>>();

    let conditional = just("(?")
        .ignore_then(number)
        .then_ignore(just(':'))
        .then(branch.clone())
        .then(just(':').ignore_then(branch).or_not())
        .then_ignore(just(')'))
        .map(|((group, if_set), if_unset)| Piece::Conditional {
            group,
            if_set,
            if_unset: if_unset.unwrap_or_default(),
        });

    choice((
        conditional,
        case,
        escape,
        group,
        any().map(|c: char| Piece::Literal(c.to_string())),
    ))
    .repeated()
    .collect::<Vec<_>>()
    .then_ignore(end())
}
