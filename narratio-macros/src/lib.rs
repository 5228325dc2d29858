//! Procedural macros for the Narratio saga runtime.
//!
//! - `#[narratio::main]` and `#[narratio::test]` run an `async fn` on a
//!   fresh runtime.
//! - `#[derive(Action)]` implements `narratio::Action` for an enum and
//!   generates its `Kind` enum.

mod utils;

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Replaces the body of an `async fn` with a blocking call running it on a
/// new runtime built by `builder`.
fn wrap_in_runtime(item: TokenStream, builder: &str, trailing: &str) -> TokenStream {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    if let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    {
        tokens.remove(async_pos);
    }

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return utils::compile_error("expected a function body");
    };

    let block = match &tokens[pos] {
        TokenTree::Group(g) => g.stream().to_string(),
        _ => unreachable!(),
    };

    let new_block = format!(
        "{{
            let runtime = {builder}.build();
            runtime
                .block_on(async move {{
                    {block}
                }}){trailing}
        }}"
    );

    match new_block.parse() {
        Ok(stream) => tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream)),
        Err(err) => return utils::compile_error(&format!("narratio: {err}")),
    }

    tokens.into_iter().collect()
}

/// Runs an `async fn main` on a Narratio runtime.
///
/// Accepts `event_budget = N` to configure the runtime.
///
/// ```rust,ignore
/// #[narratio::main(event_budget = 32)]
/// async fn main() {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut builder = String::from("::narratio::RuntimeBuilder::new()");

    for arg in utils::split_args(attr) {
        let text = arg.iter().map(ToString::to_string).collect::<String>();

        let Some(value) = text.strip_prefix("event_budget") else {
            return utils::compile_error(&format!("narratio::main: unknown option `{text}`"));
        };

        match value.trim_start_matches('=').trim().parse::<usize>() {
            Ok(n) => builder.push_str(&format!(".event_budget({n})")),
            Err(_) => {
                return utils::compile_error("narratio::main: `event_budget` expects an integer");
            }
        }
    }

    wrap_in_runtime(item, &builder, "")
}

/// Runs an `async fn` test on a fresh Narratio runtime.
///
/// ```rust,ignore
/// #[narratio::test]
/// async fn dispatch_reaches_watchers() {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let body = wrap_in_runtime(item, "::narratio::RuntimeBuilder::new()", ";");

    let mut result: TokenStream = "#[test]".parse().unwrap_or_default();
    result.extend(body);

    result
}

/// Implements `narratio::Action` for an enum.
///
/// For an enum `AppAction` it generates a field-less `AppActionKind` enum
/// with one variant per action variant, deriving `Copy`, `Eq` and `Hash`.
/// The kind converts into a `Pattern`, so it can be passed wherever a
/// pattern is expected.
///
/// `AppActionKind::as_str` (and `Display`) spell each kind in
/// `SCREAMING_SNAKE_CASE`, e.g. `BUTTON_CLICKED`.
///
/// ```rust,ignore
/// #[derive(Clone, Debug, narratio::Action)]
/// enum AppAction {
///     ButtonClicked,
///     Search(String),
///     SetMessage { text: String },
/// }
///
/// assert_eq!(AppAction::ButtonClicked.kind(), AppActionKind::ButtonClicked);
/// assert_eq!(AppActionKind::SetMessage.as_str(), "SET_MESSAGE");
/// ```
#[proc_macro_derive(Action)]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let tokens: Vec<TokenTree> = input.into_iter().collect();
    let tokens = utils::strip_attributes(&tokens);

    let Some(enum_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "enum"))
    else {
        return utils::compile_error("#[derive(Action)] only supports enums");
    };

    let vis = tokens[..enum_pos]
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    let name = match tokens.get(enum_pos + 1) {
        Some(TokenTree::Ident(id)) => id.to_string(),
        _ => return utils::compile_error("#[derive(Action)]: expected an enum name"),
    };

    let body = match tokens.get(enum_pos + 2) {
        Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Brace => g.stream(),
        _ => return utils::compile_error("#[derive(Action)] does not support generic enums"),
    };

    let mut variants = Vec::new();
    for variant in utils::split_args(body) {
        match utils::strip_attributes(&variant).first() {
            Some(TokenTree::Ident(id)) => variants.push(id.to_string()),
            _ => return utils::compile_error("#[derive(Action)]: malformed variant"),
        }
    }

    if variants.is_empty() {
        return utils::compile_error("#[derive(Action)] requires at least one variant");
    }

    let kind = format!("{name}Kind");

    let kind_variants: String = variants.iter().map(|v| format!("{v},\n")).collect();
    let all: String = variants.iter().map(|v| format!("Self::{v}, ")).collect();
    let names: String = variants
        .iter()
        .map(|v| format!("Self::{v} => {:?},\n", utils::screaming_snake(v)))
        .collect();
    let arms: String = variants
        .iter()
        .map(|v| format!("Self::{v} {{ .. }} => {kind}::{v},\n"))
        .collect();

    let output = format!(
        "
        #[derive(::std::fmt::Debug, ::std::clone::Clone, ::std::marker::Copy,
                 ::std::cmp::PartialEq, ::std::cmp::Eq, ::std::hash::Hash)]
        {vis} enum {kind} {{
            {kind_variants}
        }}

        impl {kind} {{
            /// Every kind, in declaration order.
            pub const ALL: &'static [Self] = &[{all}];

            /// The kind spelled in `SCREAMING_SNAKE_CASE`.
            pub fn as_str(self) -> &'static str {{
                match self {{
                    {names}
                }}
            }}
        }}

        impl ::std::fmt::Display for {kind} {{
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {{
                f.write_str(self.as_str())
            }}
        }}

        impl ::narratio::Action for {name} {{
            type Kind = {kind};

            fn kind(&self) -> {kind} {{
                match self {{
                    {arms}
                }}
            }}
        }}

        impl ::narratio::IntoPattern<{name}> for {kind} {{
            fn into_pattern(self) -> ::narratio::Pattern<{name}> {{
                ::narratio::Pattern::Kind(self)
            }}
        }}
        "
    );

    output
        .parse()
        .unwrap_or_else(|err| utils::compile_error(&format!("#[derive(Action)]: {err}")))
}
