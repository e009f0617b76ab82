//! Route templates for span names and metric labels.

use uuid::Uuid;

/// The request path with id segments replaced, so
/// `/cart/items/<uuid>` and every other item share one label.
pub(super) fn route_template(path: &str) -> String {
    let template = path
        .split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if template.is_empty() {
        "/".to_owned()
    } else {
        template
    }
}

#[cfg(test)]
mod tests {
    use super::route_template;

    #[test]
    fn item_ids_are_collapsed() {
        assert_eq!(
            route_template("/cart/items/0190c7d2-5d6f-7b5e-9a51-5a3f4c0e2b11"),
            "/cart/items/{id}",
            "uuid replaced"
        );
    }

    #[test]
    fn static_paths_are_unchanged() {
        assert_eq!(route_template("/cart/checkout"), "/cart/checkout", "kept");
        assert_eq!(route_template("/"), "/", "root kept");
        assert_eq!(route_template(""), "/", "empty path is root");
    }
}
