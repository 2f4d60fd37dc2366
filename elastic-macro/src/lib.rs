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

//! Elastic Macro Library
//!
//! Procedural macros for declaring messages that travel through the Elastic
//! actor runtime.
//!
//! # Message Macro
//!
//! The [`elastic_message`] macro turns a plain struct or enum into a message with a
//! stable wire tag:
//!
//! ```ignore
//! // Tag defaults to the type's identifier ("Greeting")
//! #[elastic_message]
//! pub struct Greeting {
//!     pub who: String,
//! }
//!
//! // Explicit tag, not persisted when undeliverable
//! #[elastic_message(name = "billing.Invoice", durable = false)]
//! pub struct Invoice {
//!     pub amount: u64,
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
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

/// Configuration options parsed from `#[elastic_message(...)]` attributes.
#[derive(Default)]
struct MessageConfig {
    /// Wire tag override.
    name: Option<String>,
    /// `false` only when `durable = false` was given.
    transient: bool,
}

impl MessageConfig {
    /// Parse configuration from attribute tokens.
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();

        // Options are `key = value` pairs separated by commas
        let attr_string = attr.to_string();
        for part in attr_string.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim() {
                "name" if !value.is_empty() => config.name = Some(value),
                "durable" => config.transient = value == "false",
                _ => {}
            }
        }

        config
    }
}

/// Derives everything a type needs to be sent between Elastic actors.
///
/// The attribute adds `Clone`, `Debug`, `serde::Serialize` and `serde::Deserialize`
/// (each only when not already derived) and implements `elastic_core::Message` with
/// a constant wire tag. The tag is what envelopes carry in their payload type field
/// and what codec registries resolve deserializers by, so it must stay stable once
/// messages have been persisted.
///
/// # Options
///
/// * `name = "..."` overrides the tag (defaults to the type identifier).
/// * `durable = false` marks the message as transient.
///
/// ```ignore
/// use elastic_macro::elastic_message;
///
/// #[elastic_message(name = "shop.OrderPlaced")]
/// pub struct OrderPlaced {
///     pub order_id: String,
/// }
/// ```
///
/// **Note:** the expansion refers to `::serde` and `::elastic_core`, so both must be
/// dependencies of the crate using the attribute.
#[proc_macro_attribute]
pub fn elastic_message(attr: TokenStream, item: TokenStream) -> TokenStream {
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
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(::serde::Serialize));
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(::serde::Deserialize));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let type_name = config.name.unwrap_or_else(|| name.to_string());
    let durable = !config.transient;

    let expanded = quote! {
        #derives
        #input

        impl #impl_generics ::elastic_core::Message for #name #ty_generics #where_clause {
            const TYPE_NAME: &'static str = #type_name;
            const DURABLE: bool = #durable;
        }
    };

    TokenStream::from(expanded)
}
