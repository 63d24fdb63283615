use libris::database::{DefaultBookRepository, establish_pool};
use libris::models::{
    AdjustStockError, BookAuthor, BookTitle, CreateBookError, CreateBookRequest, DeleteBookError,
    FindBookByIsbnError, FindBookError, Isbn, PublicationYear, StockQuantity, UpdateBookError,
    UpdateBookRequest,
};
use libris::repositories::BookRepository;

async fn repository() -> DefaultBookRepository {
    let pool = establish_pool("sqlite::memory:").await.unwrap();
    DefaultBookRepository::new(pool)
}

fn book_request(title: &str, author: &str, year: i32, isbn: &str, stock: i64) -> CreateBookRequest {
    CreateBookRequest::new(
        BookTitle::new(title).unwrap(),
        BookAuthor::new(author).unwrap(),
        PublicationYear::new(year).unwrap(),
        Isbn::new(isbn).unwrap(),
        StockQuantity::new(stock).unwrap(),
        true,
    )
}

#[tokio::test]
async fn create_round_trips_supplied_fields() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    assert!(book.id() > 0);
    assert_eq!(book.title().to_string(), "Dune");
    assert_eq!(book.author().to_string(), "Herbert");
    assert_eq!(book.year().value(), 1965);
    assert_eq!(book.isbn().as_str(), "9780441013593");
    assert_eq!(book.stock(), 10);
    assert!(book.is_active());
}

#[tokio::test]
async fn create_rejects_duplicate_isbn() {
    let repo = repository().await;

    repo.create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();
    let result = repo
        .create_book(&book_request("Not Dune", "Someone", 2000, "9780441013593", 3))
        .await;

    assert!(matches!(result, Err(CreateBookError::DuplicateIsbn { .. })));
    assert_eq!(repo.find_all_books().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_isbn_check_includes_inactive_rows() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("1984", "Orwell", 1949, "9780451524935", 4))
        .await
        .unwrap();
    repo.soft_delete_book(book.id()).await.unwrap();

    let result = repo
        .create_book(&book_request("1984 again", "Orwell", 1949, "9780451524935", 4))
        .await;
    assert!(matches!(result, Err(CreateBookError::DuplicateIsbn { .. })));
}

#[tokio::test]
async fn find_by_id_and_isbn() {
    let repo = repository().await;

    let created = repo
        .create_book(&book_request("The Hobbit", "Tolkien", 1937, "9780618640157", 5))
        .await
        .unwrap();

    let by_id = repo.find_book(created.id()).await.unwrap();
    assert_eq!(by_id.isbn().as_str(), "9780618640157");

    let by_isbn = repo.find_book_by_isbn("9780618640157").await.unwrap();
    assert_eq!(by_isbn.id(), created.id());
}

#[tokio::test]
async fn lookups_on_missing_keys_fail_not_found() {
    let repo = repository().await;

    assert!(matches!(
        repo.find_book(12).await,
        Err(FindBookError::NotFound { id: 12 })
    ));
    assert!(matches!(
        repo.find_book_by_isbn("9780441013593").await,
        Err(FindBookByIsbnError::NotFound { .. })
    ));
}

#[tokio::test]
async fn find_all_orders_by_title_and_excludes_inactive() {
    let repo = repository().await;

    repo.create_book(&book_request("Gamma", "Writer", 2001, "9780306406157", 2))
        .await
        .unwrap();
    let beta = repo
        .create_book(&book_request("Beta", "Writer", 2002, "9780131103627", 2))
        .await
        .unwrap();
    repo.create_book(&book_request("Alpha", "Writer", 2003, "9780747532699", 2))
        .await
        .unwrap();

    repo.soft_delete_book(beta.id()).await.unwrap();

    let titles: Vec<String> = repo
        .find_all_books()
        .await
        .unwrap()
        .iter()
        .map(|b| b.title().to_string())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Gamma"]);

    let all_titles: Vec<String> = repo
        .find_all_books_including_inactive()
        .await
        .unwrap()
        .iter()
        .map(|b| b.title().to_string())
        .collect();
    assert_eq!(all_titles, vec!["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn update_applies_only_supplied_fields() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    let mut req = UpdateBookRequest::new(book.id());
    req.set_stock(StockQuantity::new(7).unwrap());
    let updated = repo.update_book(&req).await.unwrap();

    assert_eq!(updated.stock(), 7);
    assert_eq!(updated.title().to_string(), "Dune");
    assert_eq!(updated.author().to_string(), "Herbert");
    assert_eq!(updated.year().value(), 1965);
    assert_eq!(updated.isbn().as_str(), "9780441013593");
    assert!(updated.is_active());
}

#[tokio::test]
async fn update_missing_fails_not_found() {
    let repo = repository().await;

    let mut req = UpdateBookRequest::new(5);
    req.set_title(BookTitle::new("Ghost").unwrap());

    assert!(matches!(
        repo.update_book(&req).await,
        Err(UpdateBookError::NotFound { id: 5 })
    ));
}

#[tokio::test]
async fn update_rejects_isbn_held_by_another_row() {
    let repo = repository().await;

    repo.create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();
    let other = repo
        .create_book(&book_request("The Hobbit", "Tolkien", 1937, "9780618640157", 5))
        .await
        .unwrap();

    let mut req = UpdateBookRequest::new(other.id());
    req.set_isbn(Isbn::new("9780441013593").unwrap());

    assert!(matches!(
        repo.update_book(&req).await,
        Err(UpdateBookError::DuplicateIsbn { .. })
    ));
}

#[tokio::test]
async fn update_allows_resubmitting_own_isbn() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    let mut req = UpdateBookRequest::new(book.id());
    req.set_isbn(Isbn::new("9780441013593").unwrap());
    req.set_title(BookTitle::new("Dune (reissue)").unwrap());

    let updated = repo.update_book(&req).await.unwrap();
    assert_eq!(updated.title().to_string(), "Dune (reissue)");
}

#[tokio::test]
async fn adjust_stock_applies_exact_delta() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    let up = repo.adjust_stock(book.id(), 5).await.unwrap();
    assert_eq!(up.stock(), 15);

    let down = repo.adjust_stock(book.id(), -15).await.unwrap();
    assert_eq!(down.stock(), 0);
}

#[tokio::test]
async fn adjust_stock_never_goes_negative() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    let result = repo.adjust_stock(book.id(), -11).await;
    assert!(matches!(
        result,
        Err(AdjustStockError::InsufficientStock {
            stock: 10,
            delta: -11,
            ..
        })
    ));

    // Row unchanged after the rejected adjustment.
    let unchanged = repo.find_book(book.id()).await.unwrap();
    assert_eq!(unchanged.stock(), 10);
}

#[tokio::test]
async fn adjust_stock_on_missing_row_fails_not_found() {
    let repo = repository().await;

    assert!(matches!(
        repo.adjust_stock(3, 1).await,
        Err(AdjustStockError::NotFound { id: 3 })
    ));
}

#[tokio::test]
async fn soft_delete_flips_only_the_active_flag() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    let removed = repo.soft_delete_book(book.id()).await.unwrap();
    assert!(!removed.is_active());
    assert_eq!(removed.title().to_string(), "Dune");
    assert_eq!(removed.stock(), 10);

    // Still retrievable by id and ISBN.
    assert!(repo.find_book(book.id()).await.is_ok());
    assert!(repo.find_book_by_isbn("9780441013593").await.is_ok());

    // Idempotent in effect; existence is still checked per call.
    let again = repo.soft_delete_book(book.id()).await.unwrap();
    assert!(!again.is_active());
}

#[tokio::test]
async fn soft_deleted_books_are_hidden_from_filtered_listings() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 3))
        .await
        .unwrap();
    repo.soft_delete_book(book.id()).await.unwrap();

    assert!(repo.find_all_books().await.unwrap().is_empty());
    assert!(repo.search_books_by_title("Dune").await.unwrap().is_empty());
    assert!(
        repo.search_books_by_author("Herbert")
            .await
            .unwrap()
            .is_empty()
    );
    assert!(repo.find_books_by_year(1965).await.unwrap().is_empty());
    assert!(repo.find_low_stock_books(5).await.unwrap().is_empty());
    assert_eq!(
        repo.find_all_books_including_inactive().await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn hard_delete_is_terminal() {
    let repo = repository().await;

    let book = repo
        .create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 10))
        .await
        .unwrap();

    let deleted = repo.hard_delete_book(book.id()).await.unwrap();
    assert_eq!(deleted.id(), book.id());

    assert!(matches!(
        repo.find_book(book.id()).await,
        Err(FindBookError::NotFound { .. })
    ));
    assert!(matches!(
        repo.soft_delete_book(book.id()).await,
        Err(DeleteBookError::NotFound { .. })
    ));
    assert!(matches!(
        repo.hard_delete_book(book.id()).await,
        Err(DeleteBookError::NotFound { .. })
    ));
}

#[tokio::test]
async fn search_matches_substrings() {
    let repo = repository().await;

    repo.create_book(&book_request(
        "The Fellowship of the Ring",
        "Tolkien",
        1954,
        "9780618640157",
        5,
    ))
    .await
    .unwrap();
    repo.create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 5))
        .await
        .unwrap();

    let by_title = repo.search_books_by_title("Ring").await.unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].title().to_string(), "The Fellowship of the Ring");

    let by_author = repo.search_books_by_author("Tolk").await.unwrap();
    assert_eq!(by_author.len(), 1);
}

#[tokio::test]
async fn books_by_year_matches_exactly() {
    let repo = repository().await;

    repo.create_book(&book_request("Dune", "Herbert", 1965, "9780441013593", 5))
        .await
        .unwrap();
    repo.create_book(&book_request("The Hobbit", "Tolkien", 1937, "9780618640157", 5))
        .await
        .unwrap();

    let books = repo.find_books_by_year(1965).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title().to_string(), "Dune");
}

#[tokio::test]
async fn low_stock_filters_and_orders_by_stock() {
    let repo = repository().await;

    repo.create_book(&book_request("Plenty", "Writer", 2001, "9780306406157", 9))
        .await
        .unwrap();
    repo.create_book(&book_request("Scarce", "Writer", 2002, "9780131103627", 1))
        .await
        .unwrap();
    repo.create_book(&book_request("Thin", "Writer", 2003, "9780747532699", 4))
        .await
        .unwrap();

    let low = repo.find_low_stock_books(5).await.unwrap();
    let stocks: Vec<i64> = low.iter().map(|b| b.stock()).collect();
    assert_eq!(stocks, vec![1, 4]);
}
