use crate::Directive;
use beancount_parser::DirectiveContent;

/// Sort directives chronologically, so that on any given day accounts are opened before
/// they are used and closed after.
pub fn sort_directives(directives: &mut [Directive]) {
    directives.sort_by_key(|directive| (directive.date, directive_order(directive)));
}

fn directive_order(directive: &Directive) -> u8 {
    match directive.content {
        DirectiveContent::Open(_) => 0,
        DirectiveContent::Pad(_) => 1,
        DirectiveContent::Commodity(_) => 2,
        DirectiveContent::Transaction(_) => 3,
        DirectiveContent::Balance(_) => 4,
        DirectiveContent::Price(_) => 5,
        DirectiveContent::Close(_) => 6,
        DirectiveContent::Event(_) => 7,
        _ => u8::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decimal, Entry};

    #[test]
    fn same_day_open_comes_before_transaction_and_close() {
        let source = r#"
2025-01-01 close Assets:Cash
2025-01-01 * "Coffee"
    Assets:Cash  -3.00 EUR
    Expenses:Coffee
2025-01-01 open Assets:Cash
"#;
        let mut directives: Vec<Directive> = beancount_parser::parse_iter::<Decimal>(source)
            .filter_map(|entry| match entry.unwrap() {
                Entry::Directive(directive) => Some(directive),
                _ => None,
            })
            .collect();
        sort_directives(&mut directives);

        let order: Vec<u8> = directives.iter().map(directive_order).collect();
        assert_eq!(order, vec![0, 3, 6]);
    }
}
