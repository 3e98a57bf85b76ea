pub mod category;
pub mod money;
pub mod period;
pub mod store;
pub mod transaction;

pub use category::{
    starter_categories, Category, CategoryId, NewCategory, DEFAULT_CATEGORIES, OTHER_CATEGORY_NAME,
};
pub use money::Money;
pub use period::{DateRange, Period};
pub use store::{BudgetStore, CategoryStore, StoreError, TransactionStore};
pub use transaction::{
    CanonicalTransaction, ClassifiedTransaction, Direction, OwnerId, ParseDirectionError,
};
