use leptos::*;
use leptos::ev::SubmitEvent;

#[component]
pub fn ReviewForm(on_submit: Callback<(u8, String)>) -> impl IntoView {
    let (comment, set_comment) = create_signal(String::new());
    let (rating, set_rating) = create_signal(0u8); // 0 means no star picked yet

    let handle_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        on_submit.call((rating.get_untracked(), comment.get_untracked()));
    };

    view! {
        <form class="review-form" on:submit=handle_submit>
            <h2>{ "Write a Review" }</h2>
            <h3>{ "Rating (1-5)" }</h3>
            <input
                type="number"
                min="1"
                max="5"
                prop:value=move || rating.get()
                on:input=move |e| set_rating.set(event_target_value(&e).parse::<u8>().unwrap_or(0))
            />
            <textarea
                placeholder="Share your experience with this course"
                prop:value=move || comment.get()
                on:input=move |e| set_comment.set(event_target_value(&e))
            />
            <button type="submit">{ "Submit Review" }</button>
        </form>
    }
}
