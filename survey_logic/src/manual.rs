/*!

This is the long-form manual for `survey_logic` and `survtab`.

## Concepts

A **survey** is an ordered list of questions. Questions are `TEXT`,
`SINGLE_CHOICE` or `MULTIPLE_CHOICE`; choice questions carry options. An
option may embed a jump: answering it sends the respondent to the question at
a given zero-based position, or ends the survey at once. Older surveys attach
id-keyed skip rules to the question instead; both representations are honored,
with the option-embedded form taking priority.

A **response** is one completed collection session: a map from question id to
the answer given (a string, or an array of strings for multi-select), plus an
optional location payload captured in the field.

## Input formats

`survtab` reads a survey definition from a JSON configuration file and the
collected responses from one of the following providers:

### `json`

The platform's response export: a JSON array of objects shaped as

```text
{ "id": 12, "surveyId": 3, "collectorId": 7,
  "data": { "45": "Yes", "46": ["Road", "Water"] },
  "location": { "45": { "lat": -16.9, "lng": -49.3 } } }
```

`data` keys are stringified question ids. `location` is free-form: either a
flat `{lat, lng}` object or a map of arbitrary keys to such objects.

### `csv`

One row per response. The header row names the question ids; every subsequent
row holds the answers. Multi-select answers put all selected values in one
cell, separated by the answer delimiter (`;` unless configured otherwise).

```text
id,lat,lng,45,46
r-1,-16.9,-49.3,Yes,Road;Water
r-2,,,No,
```

The `id`, `lat` and `lng` columns are optional and located through the
configuration file.

### `xlsx`

The same layout read from an Excel workbook (first worksheet unless
`excelWorksheetName` says otherwise). This is the format produced by
spreadsheet exports of the collection platform.

## Configuration

The configuration file carries the survey definition verbatim from the
platform's REST export (camelCase keys) and the list of response sources:

```text
{
  "survey": {
    "id": 3, "title": "Household census", "status": "IN", "goal": 120,
    "questions": [
      { "id": 45, "text": "Connected to the grid?", "type": "SINGLE_CHOICE",
        "order": 0,
        "options": [ { "text": "Yes", "nextQuestionIndex": 1 },
                     { "text": "No", "nextQuestionIndex": -1 } ] },
      { "id": 46, "text": "Which services are missing?", "type": "MULTIPLE_CHOICE",
        "order": 1, "options": ["Road", "Water", "Power"] }
    ]
  },
  "responseSources": [ { "provider": "csv", "filePath": "responses.csv" } ]
}
```

Option lists tolerate all three historical at-rest encodings: plain strings,
JSON-encoded strings and already-parsed objects. `nextQuestionIndex` is the
zero-based jump target; `-1` ends the survey. Legacy rules go in a
`skipLogic` array on the question: `{ "answer": "No", "nextQuestionId": 50 }`
(note: question *id*, not position).

Fields accepted per response source:

- `provider` (required): `json`, `csv` or `xlsx`.
- `filePath` (required): path relative to the configuration file.
- `answerDelimiter`: multi-select separator for csv/xlsx cells, default `;`.
- `firstResponseRowIndex`: 1-based row where data starts, default 2 (after
  the header).
- `idColumnIndex`, `latColumnIndex`, `lngColumnIndex`: 1-based positions (or
  Excel-style letters) of the bookkeeping columns, all optional.
- `excelWorksheetName`: worksheet to read for `xlsx`.

## Walkthrough scripts

`survtab --walk script.json` replays scripted answers through the navigator
to check skip logic before a survey goes to the field. The script is a JSON
array of answers given in presentation order: strings for scalar answers,
arrays for multi-select. The output lists the sequence of visited question
indices, whether an option terminated the survey early, and the response
record the session would have submitted.

*/
