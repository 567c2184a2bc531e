//! `#[tokio_timeout_test]` runs an async test on its own current-thread runtime
//! and fails it if the body has not finished within a wall-clock budget.
//!
//! ```ignore
//! #[test_timeout::tokio_timeout_test]            // 60s budget
//! #[test_timeout::tokio_timeout_test(5)]         // 5s budget
//! #[test_timeout::tokio_timeout_test(5, paused)] // 5s budget, virtual clock
//! ```
//!
//! With `paused` the runtime starts with tokio's clock frozen, so sleeps and
//! intervals auto-advance whenever the runtime is idle. The budget is then
//! enforced on the real clock only; a virtual-time timeout would fire as soon
//! as the runtime idles.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Attribute, Ident, ItemFn, LitInt, Token};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

struct TimeoutArgs {
    secs: u64,
    paused: bool,
}

enum TimeoutArg {
    Secs(LitInt),
    Flag(Ident),
}

impl Parse for TimeoutArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitInt) {
            input.parse().map(TimeoutArg::Secs)
        } else {
            input.parse().map(TimeoutArg::Flag)
        }
    }
}

impl Parse for TimeoutArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = TimeoutArgs {
            secs: DEFAULT_TIMEOUT_SECS,
            paused: false,
        };
        let items = Punctuated::<TimeoutArg, Token![,]>::parse_terminated(input)?;
        for item in items {
            match item {
                TimeoutArg::Secs(lit) => {
                    let secs: u64 = lit.base10_parse()?;
                    if secs == 0 {
                        return Err(syn::Error::new_spanned(
                            lit,
                            "timeout must be greater than zero",
                        ));
                    }
                    args.secs = secs;
                }
                TimeoutArg::Flag(ident) if ident == "paused" => args.paused = true,
                TimeoutArg::Flag(ident) => {
                    return Err(syn::Error::new_spanned(
                        &ident,
                        format!("unknown option `{ident}`; expected a second count or `paused`"),
                    ));
                }
            }
        }
        Ok(args)
    }
}

#[proc_macro_attribute]
pub fn tokio_timeout_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let TimeoutArgs { secs, paused } = parse_macro_input!(attr as TimeoutArgs);

    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            &sig.ident,
            "tokio_timeout_test can only be applied to async functions",
        )
        .to_compile_error()
        .into();
    }
    sig.asyncness = None;

    let filtered_attrs: Vec<Attribute> = attrs
        .into_iter()
        .filter(|attr| !is_test_attribute(attr))
        .collect();

    let runtime = if paused {
        quote! {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()
        }
    } else {
        quote! {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
        }
    };

    let body = if paused {
        quote! { async move #block .await }
    } else {
        quote! {
            tokio::time::timeout(timeout_duration, async move #block)
                .await
                .expect("test timed out")
        }
    };

    let thread_name = Ident::new("__timeout_test_thread", Span::call_site());

    TokenStream::from(quote! {
        #[test]
        #(#filtered_attrs)*
        #vis #sig {
            let timeout_duration = std::time::Duration::from_secs(#secs);
            let (sender, receiver) = std::sync::mpsc::channel();
            let #thread_name = std::thread::spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let runtime = #runtime.expect("failed to build Tokio runtime");
                    runtime.block_on(async { #body });
                }));
                let _ = sender.send(result);
            });
            match receiver.recv_timeout(timeout_duration) {
                Ok(Ok(_)) => {
                    let _ = #thread_name.join();
                }
                Ok(Err(payload)) => std::panic::resume_unwind(payload),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => panic!("test timed out"),
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("test thread failed before reporting result")
                }
            }
        }
    })
}

/// Matches `#[test]` and `#[tokio::test]` so the generated `#[test]` is the only one.
fn is_test_attribute(attr: &Attribute) -> bool {
    let segments: Vec<String> = attr
        .path()
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect();
    matches!(
        segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice(),
        ["test"] | ["tokio", "test"]
    )
}
