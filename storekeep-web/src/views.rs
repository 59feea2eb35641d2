//! Server-rendered HTML pages.
//!
//! Every value that originated from a user or a datastore goes through
//! [`escape`] before it reaches the markup.

use storekeep::{Manager, ProductListing, Store, StoreId, ValidationError};

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The sentence shown to an administrator for a rejected request.
pub fn validation_message(error: &ValidationError) -> String {
    match error {
        ValidationError::ManagerNotFound(manager_id) => {
            format!("Manager ID '{manager_id}' does not exist.")
        }
        ValidationError::ManagerAlreadyAssigned {
            manager_id,
            store_id,
        } => format!("Manager ID '{manager_id}' is already assigned to store {store_id}."),
        ValidationError::ManagerIdTaken(manager_id) => {
            format!("Manager ID {manager_id} already taken. Please choose a different ID.")
        }
        ValidationError::ProductStillReferenced(product_id) => {
            format!("Product with ID '{product_id}' is sold in stores and cannot be deleted.")
        }
        ValidationError::ProductNotFound(product_id) => {
            format!("Product with ID '{product_id}' does not exist.")
        }
        ValidationError::StoreNotFound(store_id) => format!("Store {store_id} does not exist."),
        ValidationError::InvalidField { field, reason } => format!("Invalid {field}: {reason}"),
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>table {{ border-collapse: collapse; }} td, th {{ border: 1px solid #999; padding: 4px 8px; }} .error {{ color: #b00; }}</style>\n\
         </head>\n\
         <body>\n\
         <nav><a href=\"/\">Home</a> | <a href=\"/stores\">Stores</a> | <a href=\"/products\">Products</a> | <a href=\"/managers\">Managers</a></nav>\n\
         <h1>{title}</h1>\n\
         {body}\n\
         </body>\n\
         </html>\n",
        title = escape(title),
    )
}

fn error_banner(error: Option<&str>) -> String {
    error.map_or_else(String::new, |message| {
        format!("<p class=\"error\">{}</p>\n", escape(message))
    })
}

fn table(columns: &[&str], rows: &str) -> String {
    let header: String = columns
        .iter()
        .map(|column| format!("<th>{}</th>", escape(column)))
        .collect();
    format!("<table>\n<tr>{header}</tr>\n{rows}</table>\n")
}

/// Landing page linking the three listings.
pub fn home() -> String {
    layout(
        "Store Administration",
        "<ul>\n\
         <li><a href=\"/stores\">Stores</a></li>\n\
         <li><a href=\"/products\">Products</a></li>\n\
         <li><a href=\"/managers\">Managers</a></li>\n\
         </ul>",
    )
}

/// Store table with an update link per row.
pub fn stores(stores: &[Store]) -> String {
    let rows: String = stores
        .iter()
        .map(|store| {
            format!(
                "<tr><td>{id}</td><td>{location}</td><td>{manager}</td>\
                 <td><a href=\"/stores/edit/{id}\">Update</a></td></tr>\n",
                id = store.id,
                location = escape(&store.location),
                manager = store
                    .manager_id
                    .as_ref()
                    .map_or_else(String::new, |manager_id| escape(manager_id)),
            )
        })
        .collect();

    layout(
        "Stores",
        &format!(
            "<p><a href=\"/stores/add\">Add Store</a></p>\n{}",
            table(&["Store ID", "Location", "Manager ID", "Action"], &rows)
        ),
    )
}

/// Values echoed back into a store form.
#[derive(Debug, Default)]
pub struct StoreFormValues<'a> {
    /// Text of the location input.
    pub location: &'a str,
    /// Text of the `mgrid` input.
    pub manager_id: &'a str,
}

fn store_form(action: &str, values: &StoreFormValues<'_>, submit: &str) -> String {
    format!(
        "<form method=\"post\" action=\"{action}\">\n\
         <label>Location <input name=\"location\" value=\"{location}\" required></label><br>\n\
         <label>Manager ID <input name=\"mgrid\" value=\"{manager_id}\"></label><br>\n\
         <button type=\"submit\">{submit}</button>\n\
         </form>",
        action = escape(action),
        location = escape(values.location),
        manager_id = escape(values.manager_id),
    )
}

/// Add-store form, prefilled with `values`.
pub fn add_store(values: &StoreFormValues<'_>, error: Option<&str>) -> String {
    layout(
        "Add Store",
        &format!(
            "{}{}",
            error_banner(error),
            store_form("/stores/add", values, "Add")
        ),
    )
}

/// Edit form for an existing store.
pub fn edit_store(store: &Store, error: Option<&str>) -> String {
    let manager_id = store
        .manager_id
        .as_ref()
        .map_or("", |manager_id| manager_id.as_ref());
    let values = StoreFormValues {
        location: &store.location,
        manager_id,
    };

    layout(
        "Edit Store",
        &format!(
            "{}<p>Store ID: {}</p>\n{}",
            error_banner(error),
            store.id,
            store_form(&edit_store_path(store.id), &values, "Update")
        ),
    )
}

/// Location of the edit form for `store_id`.
pub fn edit_store_path(store_id: StoreId) -> String {
    format!("/stores/edit/{store_id}")
}

/// Product listing. Unsold products show empty store columns.
pub fn products(listings: &[ProductListing], error: Option<&str>) -> String {
    let rows: String = listings
        .iter()
        .map(|listing| {
            let product_id = escape(&listing.product_id);
            format!(
                "<tr><td>{product_id}</td><td>{description}</td><td>{store}</td>\
                 <td>{location}</td><td>{price}</td>\
                 <td><a href=\"/products/delete/{product_id}\">Delete</a></td></tr>\n",
                description = escape(&listing.description),
                store = listing
                    .store_id
                    .map_or_else(String::new, |store_id| store_id.to_string()),
                location = listing.location.as_deref().map_or_else(String::new, escape),
                price = listing
                    .price
                    .map_or_else(String::new, |price| format!("{price:.2}")),
            )
        })
        .collect();

    layout(
        "Products",
        &format!(
            "{}{}",
            error_banner(error),
            table(
                &[
                    "Product ID",
                    "Product Description",
                    "Store ID",
                    "Location",
                    "Price",
                    "Action"
                ],
                &rows
            )
        ),
    )
}

/// Manager table.
pub fn managers(managers: &[Manager]) -> String {
    let rows: String = managers
        .iter()
        .map(|manager| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&manager.id),
                escape(&manager.name),
                manager.salary,
            )
        })
        .collect();

    layout(
        "Managers",
        &format!(
            "<p><a href=\"/managers/add\">Add Manager</a></p>\n{}",
            table(&["Manager ID", "Name", "Salary"], &rows)
        ),
    )
}

/// Values echoed back into the manager form.
#[derive(Debug, Default)]
pub struct ManagerFormValues<'a> {
    /// Text of the manager id input.
    pub manager_id: &'a str,
    /// Text of the name input.
    pub name: &'a str,
    /// Text of the salary input.
    pub salary: &'a str,
}

/// Manager registration form.
pub fn add_manager(values: &ManagerFormValues<'_>, error: Option<&str>) -> String {
    layout(
        "Add Manager",
        &format!(
            "{}<form method=\"post\" action=\"/managers/add\">\n\
             <label>Manager ID <input name=\"managerId\" value=\"{}\" required></label><br>\n\
             <label>Name <input name=\"name\" value=\"{}\" required></label><br>\n\
             <label>Salary <input name=\"salary\" value=\"{}\" required></label><br>\n\
             <button type=\"submit\">Add</button>\n\
             </form>",
            error_banner(error),
            escape(values.manager_id),
            escape(values.name),
            escape(values.salary),
        ),
    )
}

/// Body of a 404 response.
pub fn not_found(what: &str) -> String {
    layout("Not Found", &format!("<p>{} not found.</p>", escape(what)))
}

/// Body of a 500 response. Carries no error detail.
pub fn server_error() -> String {
    layout(
        "Something went wrong",
        "<p>The request could not be completed. Please try again later.</p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use storekeep::ManagerId;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn store_list_escapes_locations() {
        let page = stores(&[Store {
            id: StoreId::new(1),
            location: "<b>Galway</b>".to_string(),
            manager_id: None,
        }]);

        assert!(page.contains("&lt;b&gt;Galway&lt;/b&gt;"));
        assert!(!page.contains("<b>Galway</b>"));
        assert!(page.contains("/stores/edit/1"));
    }

    #[test]
    fn assignment_conflict_names_both_ids() {
        let message = validation_message(&ValidationError::ManagerAlreadyAssigned {
            manager_id: ManagerId::try_new("M1").expect("valid id"),
            store_id: StoreId::new(2),
        });

        assert_eq!(message, "Manager ID 'M1' is already assigned to store 2.");
    }

    #[test]
    fn error_banner_is_omitted_without_error() {
        let blank = StoreFormValues::default();
        assert!(!add_store(&blank, None).contains("class=\"error\""));
        assert!(add_store(&blank, Some("boom")).contains("<p class=\"error\">boom</p>"));
    }
}
