use scraper::{ElementRef, Html, Selector};

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// Collapsed text content of an element, trimmed like the site renders it.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .trim_matches(|c: char| c == '\n' || c == '\t' || c == ' ')
        .to_string()
}

pub(crate) fn first_text(scope: ElementRef<'_>, css: &'static str) -> Option<String> {
    scope.select(&selector(css)).next().map(text_of)
}

/// Value of `span#login_user_id`, present on every legacy page.
pub(crate) fn login_user_id(document: &Html) -> Option<String> {
    document
        .select(&selector("span#login_user_id"))
        .next()
        .map(text_of)
}
