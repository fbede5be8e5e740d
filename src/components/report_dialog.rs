use crate::reconciler::ReviewBoard;
use leptos::*;

/// Modal for reporting the review selected in the board's draft.
/// Cancel works in every state, including while a report is in flight.
#[component]
pub fn ReportDialog(
    board: RwSignal<ReviewBoard>,
    submitting: RwSignal<bool>,
    on_reason: Callback<String>,
    on_submit: Callback<()>,
    on_close: Callback<()>,
) -> impl IntoView {
    let reason = move || board.with(|b| b.report_draft().reason.clone());
    let blank = move || reason().trim().is_empty();

    view! {
        <Show when=move || board.with(|b| b.report_draft().review_id.is_some())>
            <div class="modal-backdrop" on:click=move |_| on_close.call(())></div>
            <div class="modal" role="dialog">
                <h3>{ "Report Review" }</h3>
                <label>{ "Reason for Reporting" }</label>
                <textarea
                    placeholder="Please explain why you're reporting this review..."
                    prop:value=reason
                    on:input=move |e| on_reason.call(event_target_value(&e))
                />
                <button type="button" on:click=move |_| on_close.call(())>{ "Cancel" }</button>
                <button
                    type="button"
                    disabled=move || blank() || submitting.get()
                    on:click=move |_| on_submit.call(())
                >
                    {move || if submitting.get() { "Submitting..." } else { "Submit Report" }}
                </button>
            </div>
        </Show>
    }
}
