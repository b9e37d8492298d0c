//! Module parsing on top of SWC.
//!
//! Every module is parsed as TSX with decorators enabled, which accepts plain
//! JavaScript plus type annotations, element literals, dynamic `import()`
//! and `import.meta`. Nothing is transformed here; the rewriter works from
//! the tree's spans back into the source text.

use crate::error::TransformError;
use swc_common::comments::{CommentKind, SingleThreadedComments};
use swc_common::{sync::Lrc, BytePos, FileName, SourceFile, SourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};

/// A parsed module together with the text its spans point into.
pub struct ParsedModule {
    /// The syntax tree.
    pub module: Module,
    file: Lrc<SourceFile>,
    /// Byte offsets of every `//` comment, sorted.
    line_comments: Vec<usize>,
}

impl ParsedModule {
    /// The source text that was parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.file.src
    }

    /// Byte offset into [`Self::source`] for a position inside this file.
    #[must_use]
    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.file.start_pos.0) as usize
    }

    /// Whether a `//` comment starts exactly at byte `offset`.
    ///
    /// Text that merely looks like a comment inside a string or template
    /// literal is not a comment to the lexer and answers `false`.
    #[must_use]
    pub fn is_line_comment_at(&self, offset: usize) -> bool {
        self.line_comments.binary_search(&offset).is_ok()
    }
}

/// Parse `source` as a module. `path` only labels errors.
pub fn parse_module(source: &str, path: &str) -> Result<ParsedModule, TransformError> {
    let cm: Lrc<SourceMap> = Lrc::default();
    let file = cm.new_source_file(
        Lrc::new(FileName::Custom(path.to_string())),
        source.to_string(),
    );

    let syntax = Syntax::Typescript(TsSyntax {
        tsx: true,
        decorators: true,
        ..Default::default()
    });
    let comments = SingleThreadedComments::default();
    let module = {
        let lexer = Lexer::new(
            syntax,
            EsVersion::EsNext,
            StringInput::from(&*file),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);

        let module = parser
            .parse_module()
            .map_err(|e| parse_error(&cm, path, e))?;

        // Recoverable errors still mean the text is invalid; the first one wins.
        if let Some(e) = parser.take_errors().into_iter().next() {
            return Err(parse_error(&cm, path, e));
        }
        module
    };

    let (leading, trailing) = comments.take_all();
    let mut line_comments: Vec<usize> = leading
        .borrow()
        .values()
        .chain(trailing.borrow().values())
        .flatten()
        .filter(|comment| comment.kind == CommentKind::Line)
        .map(|comment| comment.span.lo.0.saturating_sub(file.start_pos.0) as usize)
        .collect();
    line_comments.sort_unstable();
    line_comments.dedup();

    Ok(ParsedModule {
        module,
        file,
        line_comments,
    })
}

fn parse_error(cm: &SourceMap, path: &str, e: swc_ecma_parser::error::Error) -> TransformError {
    let loc = cm.lookup_char_pos(e.span().lo);
    TransformError::Parse {
        path: path.to_string(),
        line: loc.line,
        column: loc.col.0,
        message: e.kind().msg().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::{ModuleDecl, ModuleItem};

    #[test]
    fn test_parse_plain_module() {
        let parsed = parse_module("import a from './a';\nexport const b = a;", "/m.js").unwrap();
        assert_eq!(parsed.module.body.len(), 2);
        assert!(matches!(
            parsed.module.body[0],
            ModuleItem::ModuleDecl(ModuleDecl::Import(_))
        ));
    }

    #[test]
    fn test_parse_typed_element_syntax() {
        let source = r#"
            interface Props { label: string }
            export function Button(props: Props) {
                const meta = import.meta.url;
                const lazy = import("./lazy");
                return <box label={props.label} />;
            }
        "#;
        let parsed = parse_module(source, "/src/Button.tsx").unwrap();
        assert_eq!(parsed.module.body.len(), 2);
    }

    #[test]
    fn test_line_comments_located() {
        let source = "let a = 1; // trailing\n/* block */\n//# sourceMappingURL=a.js.map\n";
        let parsed = parse_module(source, "/m.js").unwrap();
        assert!(parsed.is_line_comment_at(11));
        assert!(parsed.is_line_comment_at(source.find("//#").unwrap()));
        assert!(!parsed.is_line_comment_at(source.find("/*").unwrap()));
    }

    #[test]
    fn test_comment_text_inside_template_is_not_a_comment() {
        let source = "const s = `\n//# sourceMappingURL=fake.map`;";
        let parsed = parse_module(source, "/m.js").unwrap();
        assert!(!parsed.is_line_comment_at(source.find("//#").unwrap()));
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = parse_module("const a = 1;\nconst b = {", "/broken.js")
            .err()
            .unwrap();
        match err {
            TransformError::Parse { path, line, .. } => {
                assert_eq!(path, "/broken.js");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
