//! Constructor functions for the HTML tag catalog.
//!
//! Each function returns an empty [`Element`] (or [`VoidElement`]) with the
//! tag name fixed, ready for the builder methods: `div().attr("class",
//! "card").child("hi")`.

use crate::element::{Element, VoidElement};
use crate::safe::{SafeString, mark_safe};

macro_rules! element_tags {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("The `<", stringify!($name), ">` element.")]
            pub fn $name() -> Element {
                Element::new(stringify!($name))
            }
        )*
    };
}

macro_rules! void_tags {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("The `<", stringify!($name), " />` void element.")]
            pub fn $name() -> VoidElement {
                VoidElement::new(stringify!($name))
            }
        )*
    };
}

element_tags!(
    a, abbr, address, article, aside, audio, b, bdi, bdo, blockquote, body, button, canvas,
    caption, cite, code, colgroup, data, datalist, dd, del, details, dfn, dialog, div, dl, dt, em,
    fieldset, figcaption, figure, footer, form, h1, h2, h3, h4, h5, h6, head, header, hgroup,
    html, i, iframe, ins, kbd, label, legend, li, main, map, mark, meter, nav, noscript, object,
    ol, optgroup, option, output, p, picture, pre, progress, q, rp, rt, ruby, s, samp, script,
    section, select, slot, small, span, strong, style, sub, summary, sup, table, tbody, td,
    template, textarea, tfoot, th, thead, time, title, tr, u, ul, var, video,
);

void_tags!(area, base, br, col, embed, hr, img, input, link, meta, param, source, track, wbr);

/// The HTML5 doctype declaration, pre-marked safe.
pub fn doctype() -> SafeString {
    mark_safe("<!DOCTYPE html>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::node::Node;

    #[test]
    fn test_generated_constructors_carry_their_tag() {
        assert_eq!(div().tag(), "div");
        assert_eq!(h1().tag(), "h1");
        assert_eq!(br().tag(), "br");
        assert_eq!(input().tag(), "input");
    }

    #[test]
    fn test_doctype_is_not_escaped() {
        let page = crate::node::Group::new()
            .child(doctype())
            .child(html().child(body()));
        assert_eq!(
            Node::from(page).render(&Context::new()),
            "<!DOCTYPE html><html><body></body></html>"
        );
    }
}
