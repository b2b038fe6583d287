use crate::error::{ApiError, ApiResult};
use garde::Validate;
use serde::{Deserialize, Serialize};
use yamdb_dal::{Batch, ListingParams, Order};

#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct Paging {
    #[garde(range(min = 1))]
    page: Option<u32>,
    #[garde(range(min = 1, max = 1000))]
    page_size: Option<u32>,
    #[garde(length(max = 255))]
    sort: Option<String>,
}

#[derive(Debug, Clone, Validate, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct SearchQuery {
    #[garde(length(max = 256))]
    pub search: Option<String>,
}

fn parse_ordering(orderings: &str) -> ApiResult<Vec<Order>> {
    orderings
        .split(',')
        .map(|name| {
            let (field_name, descending) = match name.trim() {
                "" => return Err(ApiError::InvalidQuery("Empty ordering name".to_string())),
                name if name.len() > 100 => {
                    return Err(ApiError::InvalidQuery("Ordering name too long".to_string()))
                }
                name if name.starts_with('+') => (&name[1..], false),
                name if name.starts_with('-') => (&name[1..], true),
                name => (name, false),
            };

            let order = if descending {
                Order::Desc(field_name.to_string())
            } else {
                Order::Asc(field_name.to_string())
            };

            Ok(order)
        })
        .collect::<Result<Vec<_>, _>>()
}

impl Paging {
    pub fn into_listing_params(self, default_page_size: u32) -> ApiResult<ListingParams> {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size(default_page_size);
        let offset = (page as i64 - 1) * page_size as i64;
        let mut params = ListingParams::new(offset, page_size as i64);
        if let Some(sort) = self.sort.as_deref() {
            params = params.with_order(parse_ordering(sort)?);
        }
        Ok(params)
    }

    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size).max(1)
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Page<T> {
    page: u32,
    page_size: u32,
    total_pages: u32,
    total: u64,
    rows: Vec<T>,
}

impl<T> Page<T>
where
    T: Serialize,
{
    pub fn try_from_batch(batch: Batch<T>, page_size: u32) -> ApiResult<Self> {
        let convert = |e: std::num::TryFromIntError| {
            ApiError::Internal(format!("Page out of range: {e}"))
        };
        Ok(Self {
            page: u32::try_from(batch.offset).map_err(convert)? / page_size + 1,
            page_size,
            total_pages: u32::try_from(batch.total.div_ceil(page_size as u64)).map_err(convert)?,
            total: batch.total,
            rows: batch.rows,
        })
    }
}
