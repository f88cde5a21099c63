//! HTML rendering for every page.

use crate::db::models::{Medicine, OrderSummary, User};
use crate::services::basket::BasketView;
use crate::services::catalog::Page;
use crate::session::Flash;
use crate::utils::{encode_query, escape_html, format_price, format_timestamp};

fn catalog_page_link(search: Option<&str>, page: u32) -> String {
    match search {
        Some(term) if !term.is_empty() => {
            format!("/meds?search={}&amp;page={}", encode_query(term), page)
        }
        _ => format!("/meds?page={}", page),
    }
}

fn field(value: &Option<String>) -> String {
    escape_html(value.as_deref().unwrap_or(""))
}

fn navigation(signed_in: bool) -> &'static str {
    if signed_in {
        r#"<nav><a href="/meds">Medicines</a> | <a href="/basket">Basket</a> | <a href="/dashboard">Dashboard</a> | <a href="/logout">Log out</a></nav>"#
    } else {
        r#"<nav><a href="/login">Log in</a> | <a href="/register">Register</a></nav>"#
    }
}

/// Wraps a page body with the shared header, navigation and flash messages.
pub fn layout(title: &str, signed_in: bool, flashes: &[Flash], body: &str) -> String {
    let flashes = flashes
        .iter()
        .map(|flash| {
            format!(
                r#"<p class="flash flash-{}">{}</p>"#,
                flash.level.as_str(),
                escape_html(&flash.message)
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title} | e-Pharmacy</title></head>\n<body>\n{nav}\n{flashes}\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape_html(title),
        nav = navigation(signed_in),
        flashes = flashes,
        body = body,
    )
}

pub fn register_form() -> String {
    r#"<form method="post" action="/register">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<label>First name <input name="first_name"></label>
<label>Last name <input name="last_name"></label>
<button type="submit">Register</button>
</form>"#
        .to_string()
}

pub fn login_form() -> String {
    r#"<form method="post" action="/login">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Log in</button>
</form>"#
        .to_string()
}

pub fn dashboard(user: &User, orders: &[OrderSummary]) -> String {
    let profile = format!(
        r#"<form method="post" action="/dashboard">
<label>Username <input name="username" value="{username}" required></label>
<label>First name <input name="first_name" value="{first_name}"></label>
<label>Last name <input name="last_name" value="{last_name}"></label>
<label>City <input name="city" value="{city}"></label>
<label>State <input name="state" value="{state}"></label>
<label>Country <input name="country" value="{country}"></label>
<label>Zip <input name="zip" value="{zip}"></label>
<button type="submit">Save profile</button>
</form>"#,
        username = escape_html(&user.username),
        first_name = field(&user.first_name),
        last_name = field(&user.last_name),
        city = field(&user.city),
        state = field(&user.state),
        country = field(&user.country),
        zip = field(&user.zip),
    );

    let history = if orders.is_empty() {
        "<p>You have not placed any orders yet.</p>".to_string()
    } else {
        let rows = orders
            .iter()
            .map(|order| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    format_timestamp(order.created_at),
                    escape_html(&order.medicine_name),
                    order.quantity,
                    escape_html(&order.status)
                )
            })
            .collect::<Vec<String>>()
            .join("\n");
        format!(
            "<table>\n<tr><th>Date</th><th>Medicine</th><th>Quantity</th><th>Status</th></tr>\n{}\n</table>",
            rows
        )
    };

    format!("{}\n<h2>Your orders</h2>\n{}", profile, history)
}

fn medicine_row(medicine: &Medicine) -> String {
    let details = [
        medicine.manufacturer.as_deref(),
        medicine.pack_size.as_deref(),
        medicine.composition_primary.as_deref(),
        medicine.composition_secondary.as_deref(),
    ]
    .iter()
    .flatten()
    .map(|detail| escape_html(detail))
    .collect::<Vec<String>>()
    .join(" · ");

    let action = if medicine.discontinued {
        "<em>Discontinued</em>".to_string()
    } else if medicine.quantity == 0 {
        "<em>Out of stock</em>".to_string()
    } else {
        format!(
            r#"<form method="post" action="/meds"><input type="hidden" name="medicine_id" value="{}"><input name="quantity" type="number" min="1" value="1"><button type="submit">Add to basket</button></form>"#,
            medicine.id
        )
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape_html(&medicine.name),
        details,
        format_price(medicine.price),
        medicine.quantity,
        action
    )
}

pub fn catalog(page: &Page<Medicine>, search: Option<&str>) -> String {
    let search_form = format!(
        r#"<form method="get" action="/meds"><input name="search" value="{}" placeholder="Search medicines"><button type="submit">Search</button></form>"#,
        escape_html(search.unwrap_or(""))
    );

    if page.items.is_empty() {
        return format!("{}\n<p>No medicines found.</p>", search_form);
    }

    let rows = page
        .items
        .iter()
        .map(medicine_row)
        .collect::<Vec<String>>()
        .join("\n");

    let mut pager = Vec::new();
    if page.has_previous() {
        pager.push(format!(
            r#"<a href="{}">Previous</a>"#,
            catalog_page_link(search, page.page - 1)
        ));
    }
    pager.push(format!("Page {} of {}", page.page, page.total_pages()));
    if page.has_next() {
        pager.push(format!(
            r#"<a href="{}">Next</a>"#,
            catalog_page_link(search, page.page + 1)
        ));
    }

    format!(
        "{}\n<table>\n<tr><th>Name</th><th>Details</th><th>Price</th><th>In stock</th><th></th></tr>\n{}\n</table>\n<p class=\"pager\">{}</p>",
        search_form,
        rows,
        pager.join(" | ")
    )
}

pub fn basket(view: &BasketView) -> String {
    if view.lines.is_empty() {
        return r#"<p>Your basket is empty. <a href="/meds">Browse medicines</a>.</p>"#.to_string();
    }

    let rows = view
        .lines
        .iter()
        .map(|line| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><form method="post" action="/basket/remove"><input type="hidden" name="medicine_id" value="{}"><button type="submit">Remove</button></form></td></tr>"#,
                escape_html(&line.medicine.name),
                line.quantity,
                format_price(line.medicine.price),
                format_price(line.cost),
                line.medicine.id
            )
        })
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "<table>\n<tr><th>Medicine</th><th>Quantity</th><th>Unit price</th><th>Cost</th><th></th></tr>\n{}\n</table>\n<p>Total: <strong>{}</strong></p>\n<form method=\"post\" action=\"/order\"><button type=\"submit\">Place order</button></form>",
        rows,
        format_price(view.total_cost)
    )
}

pub fn internal_error() -> String {
    layout(
        "Error",
        false,
        &[],
        "<p>Something went wrong. Please try again later.</p>",
    )
}
