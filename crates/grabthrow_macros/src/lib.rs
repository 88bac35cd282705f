use proc_macro::TokenStream;
use quote::quote;
use syn::{FnArg, ImplItem, ItemImpl, parse_macro_input};

/// Hook names accepted in `#[Event::Xxx]`, with the `GrabthrowPlugin` method each one fills.
const EVENT_METHODS: &[(&str, &str)] = &[
    ("CanInteract", "on_can_interact"),
    ("CannotInteract", "on_cannot_interact"),
    ("ItemPickedUp", "on_item_picked_up"),
    ("ItemThrown", "on_item_thrown"),
    ("MontagePlayed", "on_montage_played"),
    ("CameraModeChanged", "on_camera_mode_changed"),
    ("CharacterJoin", "on_character_join"),
    ("CharacterLeave", "on_character_leave"),
];

fn event_to_trait_method(event_name: &str) -> Option<&'static str> {
    EVENT_METHODS
        .iter()
        .find(|(event, _)| *event == event_name)
        .map(|(_, method)| *method)
}

/// Generates a `GrabthrowPlugin` implementation from annotated methods.
///
/// # Usage
/// ```ignore
/// #[grab_plugin]
/// impl MyPlugin {
///     #[Event::ItemThrown]
///     fn thrown(&self, event: &events::ItemThrownEvent) {
///         info!("{} threw {}", event.character, event.object);
///     }
/// }
/// ```
///
/// The `impl` block is emitted with the event attributes stripped, followed by
/// an `impl crate::events::GrabthrowPlugin` that forwards to the annotated methods.
#[proc_macro_attribute]
pub fn grab_plugin(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(item as ItemImpl);
    let self_ty = input.self_ty.clone();

    let mut trait_methods = Vec::new();
    let mut errors = Vec::new();

    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };

        let mut event_name = None;
        method.attrs.retain(|attr| {
            let segments: Vec<_> = attr.path().segments.iter().collect();
            if segments.len() == 2 && segments[0].ident == "Event" {
                event_name = Some(segments[1].ident.clone());
                return false;
            }
            true
        });

        let Some(name) = event_name else {
            continue;
        };

        let Some(trait_method_name) = event_to_trait_method(&name.to_string()) else {
            errors.push(syn::Error::new(
                name.span(),
                format!("unknown event `{name}`"),
            ));
            continue;
        };

        // Second parameter carries the event type: `&self, event: &EventType`.
        let Some(FnArg::Typed(event_arg)) = method.sig.inputs.iter().nth(1) else {
            errors.push(syn::Error::new(
                method.sig.ident.span(),
                "event handler must take the event as its second parameter",
            ));
            continue;
        };
        let event_type = &event_arg.ty;

        let trait_method_ident = syn::Ident::new(trait_method_name, method.sig.ident.span());
        let user_method_ident = &method.sig.ident;

        trait_methods.push(quote! {
            fn #trait_method_ident(&self, event: #event_type) {
                self.#user_method_ident(event)
            }
        });
    }

    if let Some(error) = errors.into_iter().reduce(|mut all, next| {
        all.combine(next);
        all
    }) {
        return error.to_compile_error().into();
    }

    let expanded = quote! {
        #input

        impl crate::events::GrabthrowPlugin for #self_ty {
            #(#trait_methods)*
        }
    };

    expanded.into()
}
