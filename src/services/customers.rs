use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pagination::{PageQuery, Pagination, CUSTOMERS_PER_PAGE};
use crate::state::AppState;
use crate::store::{CustomerTotals, SortOrder};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerParams {
    pub page: Option<i64>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerPage {
    pub customers: Vec<CustomerTotals>,
    pub pagination: Pagination,
}

fn sort_customers(customers: &mut [CustomerTotals], sort_by: Option<&str>, order: SortOrder) {
    customers.sort_by(|a, b| {
        let ordering = match sort_by {
            Some("totalOrders") => a.total_orders.cmp(&b.total_orders),
            Some("totalSpent") => a.total_spent.cmp(&b.total_spent),
            _ => a.created_at.cmp(&b.created_at),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Totals are computed per customer, so sorting and paging happen here.
pub async fn list_customers(state: &AppState, params: CustomerParams) -> Result<CustomerPage> {
    let page = PageQuery { page: params.page };
    let mut customers = state.store.customer_totals(params.search.as_deref()).await?;
    sort_customers(
        &mut customers,
        params.sort_by.as_deref().filter(|s| !s.is_empty()),
        SortOrder::from_param(params.sort_order.as_deref()),
    );
    let total = customers.len() as i64;
    let customers = customers
        .into_iter()
        .skip(page.offset(CUSTOMERS_PER_PAGE) as usize)
        .take(CUSTOMERS_PER_PAGE as usize)
        .collect();
    Ok(CustomerPage { customers, pagination: Pagination::new(page.page(), total, CUSTOMERS_PER_PAGE) })
}
