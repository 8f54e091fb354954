/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Tether Macro Library
//!
//! Procedural macros for the tether actor substrate.
//!
//! # Message Macro
//!
//! Every tether payload may cross a process boundary, so [`tether_message`] always
//! derives the serde traits alongside `Clone` and `Debug`:
//!
//! ```ignore
//! #[tether_message]
//! pub struct Connect {
//!     pub username: String,
//! }
//! ```
//!
//! # Actor Macro
//!
//! ```ignore
//! #[tether_actor]
//! pub struct Relay {
//!     clients: HashMap<String, Pid>,
//! }
//! ```
//!
//! # Main Entry Point
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! #[tether_main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Engine::<MyPayload>::launch(EngineConfig::default()).await?;
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, ItemFn};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                // Accept both `Serialize` and `serde::Serialize`.
                if meta
                    .path
                    .segments
                    .last()
                    .is_some_and(|segment| segment.ident == trait_name)
                {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Configuration options parsed from `#[tether_message(...)]` attributes.
#[derive(Default)]
struct MessageConfig {
    /// Also derive `PartialEq` and `Eq`.
    eq: bool,
}

impl MessageConfig {
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();
        let attr_string = attr.to_string();
        for part in attr_string.split(',') {
            if part.trim() == "eq" {
                config.eq = true;
            }
        }
        config
    }
}

/// Derives the traits a type needs to travel inside a tether envelope.
///
/// Expands to `#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]` (skipping any
/// already present) plus a compile-time check that the type is `Send + Sync + 'static`.
/// Pass `eq` to additionally derive `PartialEq` and `Eq`:
///
/// ```ignore
/// #[tether_message(eq)]
/// pub struct ChatMessage {
///     pub text: String,
///     pub username: String,
/// }
/// ```
///
/// The expansion names `serde` directly, so the calling crate must depend on it.
/// Container attributes such as `#[serde(tag = "kind")]` may be placed below the macro.
#[proc_macro_attribute]
pub fn tether_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = MessageConfig::parse(&attr);
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if config.eq {
            if !has_derive(&input, "PartialEq") {
                traits.push(quote!(PartialEq));
            }
            if !has_derive(&input, "Eq") {
                traits.push(quote!(Eq));
            }
        }
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(serde::Serialize));
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(serde::Deserialize));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let assert_ident = quote::format_ident!("_AssertTetherMessage_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Derives `Debug` for an actor type and checks that it is `Send + 'static`.
///
/// Actors are moved onto their own task at spawn time, so a non-`Send` field is
/// reported here rather than deep inside the spawn call.
///
/// ```ignore
/// #[tether_actor]
/// pub struct Client {
///     username: String,
///     server: Pid,
/// }
/// ```
#[proc_macro_attribute]
pub fn tether_actor(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = if has_derive(&input, "Debug") {
        quote!()
    } else {
        quote!(#[derive(Debug)])
    };

    let assert_ident = quote::format_ident!("_AssertTetherActor_{}", name);

    let expanded = quote! {
        #derives
        #input

        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    TokenStream::from(expanded)
}

/// Entry point macro for tether applications.
///
/// Builds a Tokio runtime (re-exported through `tether::__private`) and blocks on
/// the async body. Supports `flavor = "current_thread"` and `worker_threads = N`:
///
/// ```ignore
/// #[tether_main(worker_threads = 2)]
/// async fn main() { }
/// ```
#[proc_macro_attribute]
pub fn tether_main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            sig.fn_token,
            "the async keyword is missing from the function declaration",
        )
        .to_compile_error()
        .into();
    }

    if sig.ident != "main" {
        return syn::Error::new_spanned(
            &sig.ident,
            "tether_main can only be applied to the main function",
        )
        .to_compile_error()
        .into();
    }

    let attr_string = attr.to_string();
    let use_current_thread = attr_string.contains("current_thread");

    let worker_threads: Option<usize> = attr_string
        .split(',')
        .find(|s| s.contains("worker_threads"))
        .and_then(|s| s.split('=').nth(1).and_then(|v| v.trim().parse().ok()));

    let runtime_builder = if use_current_thread {
        quote! {
            ::tether::__private::tokio::runtime::Builder::new_current_thread()
        }
    } else if let Some(threads) = worker_threads {
        quote! {
            ::tether::__private::tokio::runtime::Builder::new_multi_thread()
                .worker_threads(#threads)
        }
    } else {
        quote! {
            ::tether::__private::tokio::runtime::Builder::new_multi_thread()
        }
    };

    let fn_name = &sig.ident;
    let fn_inputs = &sig.inputs;
    let fn_output = &sig.output;

    let expanded = quote! {
        #(#attrs)*
        #vis fn #fn_name(#fn_inputs) #fn_output {
            #runtime_builder
                .enable_all()
                .build()
                .expect("Failed to build tether runtime")
                .block_on(async #body)
        }
    };

    TokenStream::from(expanded)
}
