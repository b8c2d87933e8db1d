//! `#[traced]` emits a `trace` event when a function is entered and another
//! when it returns, optionally carrying the elapsed time.
//!
//! ```ignore
//! #[traced(instrument(level = tracing::Level::TRACE, skip_all), timing(precision = "ms"))]
//! async fn run(&self) { /* ... */ }
//! ```
//!
//! The exit event has a `function` field and, with `timing`, an
//! `elapsed_ms` or `elapsed_s` field. Callers need `tracing` as a dependency.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemFn, LitStr, meta::ParseNestedMeta, parse_macro_input, parse_quote};

#[derive(Clone, Copy)]
enum Precision {
    Millis,
    Seconds,
}

impl Precision {
    fn parse(literal: &LitStr) -> syn::Result<Self> {
        match literal.value().as_str() {
            "ms" => Ok(Self::Millis),
            "s" => Ok(Self::Seconds),
            other => Err(syn::Error::new(
                literal.span(),
                format!("unsupported precision `{other}`, expected \"ms\" or \"s\""),
            )),
        }
    }

    fn field(self) -> TokenStream {
        match self {
            Self::Millis => quote!(elapsed_ms = self.0.elapsed().as_millis()),
            Self::Seconds => quote!(elapsed_s = self.0.elapsed().as_secs_f64()),
        }
    }
}

#[derive(Default)]
struct Options {
    timing: Option<Precision>,
    instrument: Option<TokenStream>,
}

impl Options {
    fn accept(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("timing") {
            if self.timing.is_some() {
                return Err(meta.error("`timing` given more than once"));
            }
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("precision") {
                    self.timing = Some(Precision::parse(&inner.value()?.parse()?)?);
                    Ok(())
                } else {
                    Err(inner.error("expected `precision = \"..\"`"))
                }
            })
        } else if meta.path.is_ident("instrument") {
            if self.instrument.is_some() {
                return Err(meta.error("`instrument` given more than once"));
            }
            let fields = if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                content.parse()?
            } else {
                TokenStream::new()
            };
            self.instrument = Some(fields);
            Ok(())
        } else {
            Err(meta.error("expected `instrument` or `timing`"))
        }
    }

    /// Statement opening the function body: logs entry and binds a guard
    /// that logs exit when dropped.
    fn guard(&self, function: &str) -> syn::Stmt {
        let (definition, construct) = match self.timing {
            Some(precision) => {
                let elapsed = precision.field();
                (
                    quote! {
                        struct Exit(std::time::Instant);
                        impl std::ops::Drop for Exit {
                            fn drop(&mut self) {
                                tracing::trace!(function = #function, #elapsed, "exit");
                            }
                        }
                    },
                    quote!(Exit(std::time::Instant::now())),
                )
            }
            None => (
                quote! {
                    struct Exit;
                    impl std::ops::Drop for Exit {
                        fn drop(&mut self) {
                            tracing::trace!(function = #function, "exit");
                        }
                    }
                },
                quote!(Exit),
            ),
        };

        parse_quote! {
            let __traced_exit = {
                #definition
                tracing::trace!(function = #function, "enter");
                #construct
            };
        }
    }
}

/// Wraps a function with entry and exit `trace` events.
///
/// - `instrument(..)` forwards its arguments to `#[tracing::instrument]`
/// - `timing(precision = "ms" | "s")` adds the elapsed time to the exit event
#[proc_macro_attribute]
pub fn traced(
    args: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let mut options = Options::default();
    let parser = syn::meta::parser(|meta| options.accept(&meta));
    parse_macro_input!(args with parser);

    let mut item_fn = parse_macro_input!(item as ItemFn);

    let guard = options.guard(&item_fn.sig.ident.to_string());
    item_fn.block.stmts.insert(0, guard);

    if let Some(fields) = options.instrument {
        item_fn.attrs.push(parse_quote!(#[tracing::instrument(#fields)]));
    }

    quote!(#item_fn).into()
}
