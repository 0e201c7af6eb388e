//! Demonstration of a keyed store driving a small todo view

use statio::Store;

#[derive(Clone, Debug, PartialEq)]
struct TodoItem {
    id: usize,
    title: String,
    completed: bool,
}

fn stats(todos: &[TodoItem]) -> (usize, usize) {
    let completed = todos.iter().filter(|t| t.completed).count();
    (todos.len(), completed)
}

fn main() {
    println!("=== Store Example: Todos ===\n");

    let store = Store::global();
    store.set("todos", Vec::<TodoItem>::new());
    store.set("filter", "all");

    // Subscribe to state changes
    println!("1. Setting up subscribers");
    let _todos = store.subscribe::<Vec<TodoItem>>("todos", |todos| {
        let (total, completed) = stats(todos);
        println!("   [todos] Total: {}, Completed: {}", total, completed);
    });
    let _filter = store.subscribe::<&'static str>("filter", |filter| {
        println!("   [filter] {}", filter);
    });
    let _count = store.select::<Vec<TodoItem>, usize>(
        "todos",
        |todos| todos.len(),
        |len| println!("   [count] {} items", len),
    );

    // Add todos
    println!("\n2. Adding todos");
    for title in ["Learn Rust", "Build reactive store", "Write documentation"] {
        store
            .update::<Vec<TodoItem>>("todos", |todos| {
                let id = todos.len();
                todos.push(TodoItem {
                    id,
                    title: title.to_string(),
                    completed: false,
                });
            })
            .expect("todos initialised above");
    }

    // Complete two todos and switch the filter in one batch
    println!("\n3. Completing two todos and filtering, batched");
    store.batch(|| {
        for id in [0, 1] {
            store
                .update::<Vec<TodoItem>>("todos", |todos| todos[id].completed = true)
                .expect("todos initialised above");
        }
        store.set("filter", "completed");
    });

    // Updating a key that was never set fails
    println!("\n4. Updating a missing key");
    if let Err(err) = store.update::<u32>("visits", |v| *v += 1) {
        println!("   error: {}", err);
    }

    println!("\n5. Completed todos:");
    if let Some(todos) = store.get::<Vec<TodoItem>>("todos") {
        for todo in todos.iter().filter(|t| t.completed) {
            println!("   [✓] {}", todo.title);
        }
    }

    println!("\n✓ Example complete!");
}
