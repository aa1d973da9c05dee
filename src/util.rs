use scraper::ElementRef;

/// All text below `element`, concatenated and trimmed at both ends.
pub fn inner_text(element: ElementRef<'_>) -> String {
    let text = element.text().collect::<String>();
    text.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    #[test]
    fn keeps_inner_spacing() {
        let html = Html::parse_fragment("<p>\n  Why <em>pray</em> at all?  </p>");
        let p = html.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(super::inner_text(p), "Why pray at all?");
    }
}
