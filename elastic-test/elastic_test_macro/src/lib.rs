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

//! The `#[elastic_test]` attribute behind `elastic-test`.

use proc_macro::TokenStream;

use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn};

/// Turns an `async fn` into a `#[test]` that runs on its own multi-thread tokio runtime.
///
/// The first panic raised anywhere on that runtime, spawned actor tasks included, is
/// remembered and re-raised on the test thread once the body finishes. The body runs
/// inside an `elastic_test` span carrying the test name. It may return `()` or any
/// `Result<(), E>` with `E: Debug`.
#[proc_macro_attribute]
pub fn elastic_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(proc_macro2::Span::call_site(), "#[elastic_test] takes no arguments")
            .to_compile_error()
            .into();
    }
    let test = parse_macro_input!(item as ItemFn);
    expand(test).unwrap_or_else(syn::Error::into_compile_error).into()
}

fn expand(test: ItemFn) -> syn::Result<TokenStream2> {
    if test.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(test.sig.fn_token, "#[elastic_test] expects an `async fn`"));
    }
    if !test.sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(&test.sig.inputs, "#[elastic_test] functions take no arguments"));
    }

    let ItemFn { attrs, vis, sig, block } = test;
    let name = sig.ident.clone();
    let mut body_sig = sig;
    body_sig.ident = format_ident!("__elastic_test_{}", name);
    let body_name = &body_sig.ident;

    Ok(quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use ::elastic_test::__private::{parking_lot::Mutex, tokio, tracing, TestOutcome};

            let first_panic: ::std::sync::Arc<Mutex<Option<(String, String)>>> = ::std::default::Default::default();
            let recorder = ::std::sync::Arc::clone(&first_panic);
            let previous_hook = ::std::panic::take_hook();
            ::std::panic::set_hook(Box::new(move |info| {
                let message = ::elastic_test::__private::panic_message(info.payload());
                let location = info
                    .location()
                    .map_or_else(|| "unknown location".to_owned(), |l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                tracing::error!(%location, "panic in test runtime: {}", message);
                recorder.lock().get_or_insert((location, message));
                previous_hook(info);
            }));

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("elastic_test could not build a tokio runtime");
            let span = tracing::info_span!("elastic_test", test = stringify!(#name));
            let outcome = runtime.block_on(tracing::Instrument::instrument(#body_name(), span));
            drop(runtime);

            if let Some((location, message)) = first_panic.lock().take() {
                panic!("panic at {location}: {message}");
            }
            outcome.conclude();
        }

        #body_sig #block
    })
}
