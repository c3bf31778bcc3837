//! The assembler half of the pipeline: source text in, [`Image`] out
//! (spec §4.1-§4.3, §6 `translate`).

pub mod ast;
pub mod lexer;
pub mod layout;
pub mod parser;
pub mod token;

use crate::error::Error;
use crate::image::Image;

/// `translate(source) -> image` (spec §6). Pure: the same source always
/// produces the same image (spec §5).
pub fn translate(source: &str) -> Result<Image, Error> {
    log::info!("assembling {} bytes of source", source.len());
    let program = parser::parse(source)?;
    let image = layout::link(&program)?;
    log::info!(
        "assembled image: {} words ({} records)",
        image.word_count(),
        image.records.len()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_is_deterministic() {
        let src = ".data\nmsg: 5, \"hello\"\n.text\n_start: ld msg\nhlt\n";
        let a = translate(src).unwrap();
        let b = translate(src).unwrap();
        assert_eq!(a, b);
    }
}
