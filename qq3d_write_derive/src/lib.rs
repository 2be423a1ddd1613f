extern crate proc_macro;

use crate::proc_macro::TokenStream;

use darling::{ast, FromDeriveInput, FromField};
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Ident};

#[derive(FromDeriveInput)]
#[darling(attributes(qq3dwrite), supports(struct_named))]
struct WriteOptions {
    ident: Ident,
    data: ast::Data<(), FieldOptions>,
    /// Zero bytes written after the last field.
    #[darling(default)]
    pad_after: Option<usize>,
}

#[derive(FromField)]
#[darling(attributes(qq3dwrite))]
struct FieldOptions {
    ident: Option<Ident>,
    /// Zero bytes written after this field.
    #[darling(default)]
    pad_after: Option<usize>,
}

#[proc_macro_derive(Qq3dWrite, attributes(qq3dwrite))]
pub fn qq3d_write_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let options = match WriteOptions::from_derive_input(&input) {
        Ok(options) => options,
        Err(e) => return TokenStream::from(e.write_errors()),
    };

    let implementing_type = &options.ident;
    let fields = options
        .data
        .take_struct()
        .expect("expected a struct with named fields")
        .fields;

    let write_fields = fields.iter().map(|field| {
        let name = &field.ident;
        let pad = field.pad_after.unwrap_or_default();
        quote! {
            qq3d_write::Qq3dWrite::qq3d_write(&self.#name, writer)?;
            writer.write_all(&[0u8; #pad])?;
        }
    });

    let field_sizes = fields.iter().map(|field| {
        let name = &field.ident;
        let pad = field.pad_after.unwrap_or_default() as u64;
        quote! {
            size += qq3d_write::Qq3dWrite::size_in_bytes(&self.#name) + #pad;
        }
    });

    let pad_after = options.pad_after.unwrap_or_default();
    let pad_after_size = pad_after as u64;

    let expanded: proc_macro2::TokenStream = quote! {
        impl qq3d_write::Qq3dWrite for #implementing_type {
            fn qq3d_write<W: std::io::Write + std::io::Seek>(
                &self,
                writer: &mut W,
            ) -> std::io::Result<()> {
                #(#write_fields)*
                writer.write_all(&[0u8; #pad_after])?;
                Ok(())
            }

            fn size_in_bytes(&self) -> u64 {
                let mut size = 0;
                #(#field_sizes)*
                size + #pad_after_size
            }
        }
    };

    TokenStream::from(expanded)
}
