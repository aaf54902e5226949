mod command;
pub mod refs;
pub mod span;

pub use crate::{
    command::{parse_command, Action, CommandError, CommandNode, Modifier, NameList},
    span::Span,
};

fn stream_from_str<'a>(
    src: &'a str,
) -> chumsky::Stream<
    'a,
    char,
    Span,
    std::iter::Map<std::iter::Enumerate<std::str::Chars<'a>>, fn((usize, char)) -> (char, Span)>,
> {
    let len = src.chars().count();
    chumsky::Stream::<_, Span, _>::from_iter(
        Span::new(len, len),
        src.chars()
            .enumerate()
            .map(|(i, c)| (c, Span::new(i, i + 1))),
    )
}
